use std::f64::consts::TAU;

pub const DIAL_SIZE: f64 = 220.0;
pub const CENTER_X: f64 = 110.0;
pub const CENTER_Y: f64 = 110.0;
pub const DIAL_RADIUS: f64 = 100.0;
pub const MAX_MINUTES: f64 = 60.0;

const DRAG_DAMPING: f64 = 0.999;
const WRAP_HIGH_MINUTES: f64 = 45.0;
const WRAP_LOW_MINUTES: f64 = 15.0;

// Pointer coordinates use the dial's own frame: origin at the top-left of a
// DIAL_SIZE x DIAL_SIZE box, y growing downward, like the control it models.

pub fn pointer_angle(x: f64, y: f64) -> f64 {
    let angle = (y - CENTER_Y).atan2(x - CENTER_X);
    // rotate so 12 o'clock is zero; upper-left quadrant wraps past a full turn
    if angle > -TAU / 2.0 && angle < -TAU / 4.0 {
        angle + TAU * 1.25
    } else {
        angle + TAU * 0.25
    }
}

pub fn angle_to_minutes(angle: f64) -> f64 {
    angle / TAU * MAX_MINUTES
}

pub fn radians_to_degrees(angle: f64) -> f64 {
    angle / (std::f64::consts::PI / 180.0)
}

pub fn polar_to_cartesian(center_x: f64, center_y: f64, radius: f64, angle_degrees: f64) -> (f64, f64) {
    let angle = angle_degrees * std::f64::consts::PI / 180.0;
    (center_x + radius * angle.cos(), center_y + radius * angle.sin())
}

pub fn handle_center(angle: f64, radius: f64) -> (f64, f64) {
    (CENTER_X + angle.cos() * radius, CENTER_Y + angle.sin() * radius)
}

pub fn describe_arc(x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) -> String {
    // a 0-sweep arc command cannot express the full circle
    let full_circle = end_angle - start_angle == 360.0;
    let end_angle = if full_circle { 359.0 } else { end_angle };

    let start = polar_to_cartesian(x, y, radius, end_angle);
    let end = polar_to_cartesian(x, y, radius, start_angle);
    let arc_sweep = if end_angle - start_angle <= 180.0 { '0' } else { '1' };

    if full_circle {
        format!(
            "M {} {} A {} {} 0 {} 0 {} {} z",
            start.0, start.1, radius, radius, arc_sweep, end.0, end.1
        )
    } else {
        format!(
            "M {} {} A {} {} 0 {} 0 {} {}",
            start.0, start.1, radius, radius, arc_sweep, end.0, end.1
        )
    }
}

pub fn idle_minute_value(elapsed_seconds: i64) -> f64 {
    ((elapsed_seconds.max(0) as f64 / 60.0) % MAX_MINUTES).round()
}

pub fn idle_arc_degrees(elapsed_seconds: i64) -> f64 {
    (idle_minute_value(elapsed_seconds) / MAX_MINUTES * 360.0).floor()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DialUpdate {
    pub minute_value: f64,
    pub total_seconds: i64,
}

#[derive(Debug, Clone, Default)]
pub struct DialController {
    state: DragState,
    last_spin_value: Option<f64>,
}

impl DialController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.state == DragState::Dragging
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, elapsed_seconds: i64) -> Option<DialUpdate> {
        if self.state == DragState::Dragging {
            return None;
        }

        self.state = DragState::Dragging;
        Some(self.sample(x, y, elapsed_seconds))
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, elapsed_seconds: i64) -> Option<DialUpdate> {
        if self.state != DragState::Dragging {
            return None;
        }

        Some(self.sample(x, y, elapsed_seconds))
    }

    pub fn pointer_up(&mut self) {
        if self.state == DragState::Dragging {
            self.state = DragState::Idle;
            self.last_spin_value = None;
        }
    }

    fn sample(&mut self, x: f64, y: f64, elapsed_seconds: i64) -> DialUpdate {
        let angle = pointer_angle(x, y) * DRAG_DAMPING;
        let minute_value = angle_to_minutes(angle);

        // crossing 12 o'clock carries into the hour counter; the 45/15 dead
        // zone tolerates reverse jitter near the boundary
        let mut hours_correction = 0i64;
        if let Some(last) = self.last_spin_value {
            if last > WRAP_HIGH_MINUTES
                && minute_value < last
                && minute_value < WRAP_LOW_MINUTES
            {
                hours_correction = 1;
            } else if last < WRAP_LOW_MINUTES
                && minute_value > last
                && minute_value > WRAP_HIGH_MINUTES
            {
                hours_correction = -1;
            }
        }

        let whole_hours = elapsed_seconds.max(0) / 3600 + hours_correction;
        let total_minutes = whole_hours * 60 + minute_value.floor() as i64;
        self.last_spin_value = Some(minute_value);

        DialUpdate {
            minute_value,
            total_seconds: total_minutes.max(0) * 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;

    use super::{
        CENTER_X, CENTER_Y, DIAL_RADIUS, DialController, angle_to_minutes, describe_arc,
        idle_arc_degrees, idle_minute_value, pointer_angle,
    };

    fn point_for_minutes(minutes: f64) -> (f64, f64) {
        let rotated = minutes / 60.0 * TAU;
        let raw = rotated - TAU / 4.0;
        (
            CENTER_X + DIAL_RADIUS * raw.cos(),
            CENTER_Y + DIAL_RADIUS * raw.sin(),
        )
    }

    fn drag(
        controller: &mut DialController,
        minutes: f64,
        elapsed_seconds: i64,
        first: bool,
    ) -> i64 {
        let (x, y) = point_for_minutes(minutes);
        let update = if first {
            controller.pointer_down(x, y, elapsed_seconds)
        } else {
            controller.pointer_move(x, y, elapsed_seconds)
        };
        update.expect("drag sample should produce an update").total_seconds
    }

    #[test]
    fn twelve_oclock_is_angle_zero() {
        let angle = pointer_angle(CENTER_X, CENTER_Y - DIAL_RADIUS);
        assert!(angle.abs() < 1e-9);

        let quarter_past = pointer_angle(CENTER_X + DIAL_RADIUS, CENTER_Y);
        assert!((angle_to_minutes(quarter_past) - 15.0).abs() < 1e-9);

        let half_past = pointer_angle(CENTER_X, CENTER_Y + DIAL_RADIUS);
        assert!((angle_to_minutes(half_past) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn forward_wrap_increments_the_hour_exactly_once() {
        let mut controller = DialController::new();
        let mut elapsed = 0i64;

        for (index, minutes) in [50.0, 58.0, 2.0, 10.0].into_iter().enumerate() {
            elapsed = drag(&mut controller, minutes, elapsed, index == 0);
        }

        // 1 whole hour plus the last sample's ~10 minutes
        assert_eq!(elapsed / 3600, 1);
        assert_eq!(elapsed, 3600 + 9 * 60);
    }

    #[test]
    fn backward_wrap_decrements_the_hour() {
        let mut controller = DialController::new();
        let mut elapsed = 3660;

        elapsed = drag(&mut controller, 2.0, elapsed, true);
        assert_eq!(elapsed / 3600, 1);

        elapsed = drag(&mut controller, 58.0, elapsed, false);
        assert_eq!(elapsed / 3600, 0);
        assert_eq!(elapsed, 57 * 60);
    }

    #[test]
    fn reverse_jitter_inside_the_dead_zone_does_not_wrap() {
        let mut controller = DialController::new();
        let mut elapsed = 0i64;

        elapsed = drag(&mut controller, 58.0, elapsed, true);
        elapsed = drag(&mut controller, 50.0, elapsed, false);
        assert_eq!(elapsed / 3600, 0);
    }

    #[test]
    fn releasing_the_pointer_forgets_the_last_sample() {
        let mut controller = DialController::new();
        let mut elapsed = 0i64;

        elapsed = drag(&mut controller, 58.0, elapsed, true);
        controller.pointer_up();
        assert!(!controller.is_dragging());

        // a fresh gesture crossing the boundary is not a wrap
        elapsed = drag(&mut controller, 2.0, elapsed, true);
        assert_eq!(elapsed / 3600, 0);
    }

    #[test]
    fn pointer_down_while_dragging_is_ignored() {
        let mut controller = DialController::new();
        let (x, y) = point_for_minutes(10.0);

        assert!(controller.pointer_down(x, y, 0).is_some());
        assert!(controller.pointer_down(x, y, 0).is_none());
        assert!(controller.is_dragging());
    }

    #[test]
    fn pointer_move_without_a_gesture_is_ignored() {
        let mut controller = DialController::new();
        let (x, y) = point_for_minutes(10.0);
        assert!(controller.pointer_move(x, y, 0).is_none());
    }

    #[test]
    fn arc_paths_set_the_large_arc_flag_past_half_a_turn() {
        let small = describe_arc(110.0, 110.0, 100.0, 0.0, 90.0);
        assert!(small.contains(" 0 0 0 "));
        assert!(!small.ends_with('z'));

        let large = describe_arc(110.0, 110.0, 100.0, 0.0, 270.0);
        assert!(large.contains(" 0 1 0 "));
    }

    #[test]
    fn full_circle_arc_is_closed_at_359_degrees() {
        let path = describe_arc(110.0, 110.0, 100.0, 0.0, 360.0);
        assert!(path.ends_with('z'));

        let start = describe_arc(110.0, 110.0, 100.0, 0.0, 359.0);
        let prefix = start.split(" A ").next().expect("path has a move command");
        assert!(path.starts_with(prefix));
    }

    #[test]
    fn idle_rendering_maps_elapsed_time_onto_the_dial() {
        assert_eq!(idle_minute_value(1800), 30.0);
        assert_eq!(idle_arc_degrees(1800), 180.0);

        // 65 minutes shows as 5 past the hour
        assert_eq!(idle_minute_value(3900), 5.0);
        assert_eq!(idle_arc_degrees(0), 0.0);
    }
}
