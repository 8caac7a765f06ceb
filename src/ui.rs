use std::collections::HashSet;
use std::error::Error;
use std::io;
use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use crossterm::event::{
	self, DisableMouseCapture, EnableMouseCapture, Event as CEvent, KeyCode, KeyEventKind,
	MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
	disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Circle, Points};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::aggregate::{aggregate, DateBucket, EntryFilter, GroupingMode};
use crate::config::{load_settings, save_settings, Settings};
use crate::domain::{format_duration, Entry};
use crate::slider::{self, DialController, DialUpdate};
use crate::storage::{load_entries, load_timer_start, prepend_entry, save_timer_start};
use crate::suggest::{ranked_tags, SuggestionSession};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const DIAL_TRACK_COLOR: Color = Color::DarkGray;
const DIAL_ARC_COLOR: Color = Color::Blue;
const DIAL_HANDLE_COLOR: Color = Color::Gray;

pub fn run_dashboard(store_path: &Path) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, store_path);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	store_path: &Path,
) -> Result<(), Box<dyn Error>> {
	let mut entries = load_entries(store_path)?;
	let mut timer_start = match load_timer_start(store_path)? {
		Some(start) => start,
		None => {
			let now = Utc::now();
			save_timer_start(store_path, now)?;
			now
		}
	};

	let mut app = match load_settings() {
		Ok(settings) => App::new(settings),
		Err(err) => {
			let mut app = App::new(Settings::default());
			app.status = format!("warning: {err}");
			app
		}
	};

	loop {
		let now = Utc::now();
		let view = build_view(&app, &entries, timer_start, now);
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_dashboard(frame, &mut app, &view))?;

		if event::poll(StdDuration::from_millis(250))? {
			match event::read()? {
				CEvent::Key(key) => {
					if key.kind != KeyEventKind::Press {
						continue;
					}

					let should_quit = match &app.mode {
						InputMode::Prompt(_) => handle_prompt_key(
							&mut app,
							key.code,
							&mut entries,
							store_path,
							&mut timer_start,
						),
						InputMode::Normal => handle_normal_key(
							&mut app,
							key.code,
							store_path,
							&mut timer_start,
							&view,
						),
					};

					if should_quit {
						break;
					}
				}
				CEvent::Mouse(mouse) => {
					handle_mouse(&mut app, mouse, store_path, &mut timer_start);
				}
				_ => {}
			}
		}
	}

	Ok(())
}

fn draw_dashboard(frame: &mut Frame, app: &mut App, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Min(12), Constraint::Length(6)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
		.split(layout[0]);

	render_history_panel(frame, body[0], app, view);
	render_timer_panel(frame, body[1], app, view);
	render_footer(frame, layout[1], app);
}

fn render_history_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let items = view
		.history_rows
		.iter()
		.map(|row| ListItem::new(row.line.clone()))
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !view.history_rows.is_empty() {
		state.select(Some(app.history_index.min(view.history_rows.len() - 1)));
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title(history_title(app))
		.border_style(border_style(app.focus == FocusPane::History));
	let list = List::new(items)
		.block(block)
		.highlight_style(
			Style::default()
				.bg(HIGHLIGHT_BACKGROUND_COLOR)
				.add_modifier(Modifier::BOLD),
		);

	frame.render_stateful_widget(list, area, &mut state);
}

fn history_title(app: &App) -> String {
	let mut title = format!("History by {}", app.grouping.name());
	if let Some(fulltext) = &app.filter.fulltext {
		title.push_str(&format!(" | \"{fulltext}\""));
	}
	if let Some(min_date) = app.filter.min_date {
		title.push_str(&format!(" | from {min_date}"));
	}
	if let Some(max_date) = app.filter.max_date {
		title.push_str(&format!(" | until {max_date}"));
	}
	title
}

fn render_timer_panel(frame: &mut Frame, area: Rect, app: &mut App, view: &ViewModel) {
	app.dial_area = area;

	let title = format!("Timer ~ {}", format_duration(view.elapsed_seconds));
	let block = Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(app.focus == FocusPane::Dial));

	let arc_degrees = view.dial_arc_degrees;
	let canvas = Canvas::default()
		.block(block)
		.marker(Marker::Braille)
		.x_bounds([0.0, slider::DIAL_SIZE])
		.y_bounds([0.0, slider::DIAL_SIZE])
		.paint(move |ctx| {
			ctx.draw(&Circle {
				x: slider::CENTER_X,
				y: slider::DIAL_SIZE - slider::CENTER_Y,
				radius: slider::DIAL_RADIUS,
				color: DIAL_TRACK_COLOR,
			});

			// the dial frame has y growing downward and zero at 3 o'clock;
			// rotate a quarter turn back and flip y for the canvas
			let mut arc_points = Vec::new();
			let mut angle = 0.0f64;
			while angle <= arc_degrees {
				let (x, y) = slider::polar_to_cartesian(
					slider::CENTER_X,
					slider::CENTER_Y,
					slider::DIAL_RADIUS,
					angle - 90.0,
				);
				arc_points.push((x, slider::DIAL_SIZE - y));
				angle += 2.0;
			}
			ctx.draw(&Points {
				coords: &arc_points,
				color: DIAL_ARC_COLOR,
			});

			let (handle_x, handle_y) =
				slider::handle_center((arc_degrees - 90.0).to_radians(), slider::DIAL_RADIUS);
			ctx.draw(&Circle {
				x: handle_x,
				y: slider::DIAL_SIZE - handle_y,
				radius: 8.0,
				color: DIAL_HANDLE_COLOR,
			});
		});

	frame.render_widget(canvas, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from(
				"Tab pane | arrows/jk scroll | Enter expand tag | g grouping | / filter | [ ] date bounds",
			),
			Line::from("a add entry | r reset timer | drag the dial to adjust the timer | q quit"),
			Line::from(app.status.clone()),
		],
		InputMode::Prompt(prompt) => {
			let suggestions = app.suggestions.suggestions().join(" ");
			vec![
				Line::from(prompt.title.clone()),
				Line::from(format!("> {}", prompt.input)),
				Line::from(Span::styled(
					suggestions,
					Style::default().fg(Color::DarkGray),
				)),
				Line::from("Enter submit | Esc cancel | Tab complete tag"),
			]
		}
	};

	let footer =
		Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn handle_normal_key(
	app: &mut App,
	code: KeyCode,
	store_path: &Path,
	timer_start: &mut DateTime<Utc>,
	view: &ViewModel,
) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => true,
		KeyCode::Tab => {
			app.focus = app.focus.next();
			false
		}
		KeyCode::BackTab => {
			app.focus = app.focus.prev();
			false
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if app.focus == FocusPane::History {
				app.move_history_selection(-1, view);
			}
			false
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if app.focus == FocusPane::History {
				app.move_history_selection(1, view);
			}
			false
		}
		KeyCode::Char('g') => {
			app.grouping = app.grouping.next();
			app.history_index = 0;
			app.settings.set_grouping_mode(app.grouping);
			app.status = match save_settings(&app.settings) {
				Ok(()) => format!("grouping by {}", app.grouping.name()),
				Err(err) => format!("grouping by {} (warning: {err})", app.grouping.name()),
			};
			false
		}
		KeyCode::Char('/') => {
			app.mode = InputMode::Prompt(PromptState::new(
				"Fulltext filter (empty clears)",
				PromptKind::FulltextFilter,
			));
			false
		}
		KeyCode::Char('[') => {
			app.mode = InputMode::Prompt(PromptState::new(
				"From date, YYYY-MM-DD (empty clears)",
				PromptKind::MinDate,
			));
			false
		}
		KeyCode::Char(']') => {
			app.mode = InputMode::Prompt(PromptState::new(
				"Until date, YYYY-MM-DD (empty clears)",
				PromptKind::MaxDate,
			));
			false
		}
		KeyCode::Char('a') => {
			app.mode = InputMode::Prompt(PromptState::new(
				"Duration (e.g. 45s, 30m, 1.5h; bare numbers are minutes)",
				PromptKind::AddEntryDuration,
			));
			false
		}
		KeyCode::Char('r') => {
			*timer_start = Utc::now();
			app.status = match save_timer_start(store_path, *timer_start) {
				Ok(()) => "timer reset".to_string(),
				Err(err) => format!("error: {err}"),
			};
			false
		}
		KeyCode::Enter => {
			if let Some(HistoryRowKind::Tag { key }) = view
				.history_rows
				.get(app.history_index)
				.map(|row| row.kind.clone())
			{
				if !app.expanded_tags.remove(&key) {
					app.expanded_tags.insert(key);
				}
			}
			false
		}
		_ => false,
	}
}

fn handle_prompt_key(
	app: &mut App,
	code: KeyCode,
	entries: &mut Vec<Entry>,
	store_path: &Path,
	timer_start: &mut DateTime<Utc>,
) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.suggestions.reset();
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			let mut observed = None;
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
				if matches!(prompt.kind, PromptKind::AddEntryDescription { .. }) {
					observed = Some(prompt.input.clone());
				}
			}
			refresh_suggestions(app, entries, observed);
		}
		KeyCode::Tab => {
			let in_description = matches!(
				&app.mode,
				InputMode::Prompt(prompt)
					if matches!(prompt.kind, PromptKind::AddEntryDescription { .. })
			);
			if !in_description {
				return false;
			}

			if let Some(completion) = app.suggestions.advance() {
				if let InputMode::Prompt(prompt) = &mut app.mode {
					prompt.input = completion.text.clone();
				}
				let ranked = ranked_tags(entries);
				app.suggestions
					.observe(&completion.text, completion.cursor, &ranked);
			}
		}
		KeyCode::Char(value) => {
			let mut observed = None;
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
				if matches!(prompt.kind, PromptKind::AddEntryDescription { .. }) {
					observed = Some(prompt.input.clone());
				}
			}
			refresh_suggestions(app, entries, observed);
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal => return false,
			};
			submit_prompt(app, prompt, entries, store_path, timer_start);
		}
		_ => {}
	}

	false
}

fn refresh_suggestions(app: &mut App, entries: &[Entry], observed: Option<String>) {
	if let Some(text) = observed {
		let ranked = ranked_tags(entries);
		let cursor = text.len();
		app.suggestions.observe(&text, cursor, &ranked);
	}
}

fn submit_prompt(
	app: &mut App,
	prompt: PromptState,
	entries: &mut Vec<Entry>,
	store_path: &Path,
	timer_start: &mut DateTime<Utc>,
) {
	match prompt.kind {
		PromptKind::FulltextFilter => {
			app.filter.fulltext = optional_text(&prompt.input);
			app.history_index = 0;
			app.status = match &app.filter.fulltext {
				Some(fulltext) => format!("filtering \"{fulltext}\""),
				None => "fulltext filter cleared".to_string(),
			};
		}
		PromptKind::MinDate => apply_date_bound(app, prompt, true),
		PromptKind::MaxDate => apply_date_bound(app, prompt, false),
		PromptKind::AddEntryDuration => {
			app.mode = InputMode::Prompt(PromptState::new(
				"Description (#tags, Tab completes)",
				PromptKind::AddEntryDescription {
					duration: prompt.input,
				},
			));
		}
		PromptKind::AddEntryDescription { duration } => {
			app.suggestions.reset();
			let entry = Entry::new(Utc::now(), &duration, &prompt.input);
			let summary = format!(
				"logged {} {}",
				format_duration(entry.duration),
				entry.description
			);

			match prepend_entry(store_path, entry.clone()) {
				Ok(()) => {
					entries.insert(0, entry);
					*timer_start = Utc::now();
					app.status = match save_timer_start(store_path, *timer_start) {
						Ok(()) => summary,
						Err(err) => format!("{summary} (warning: {err})"),
					};
					app.history_index = 0;
				}
				Err(err) => app.status = format!("error: {err}"),
			}
		}
	}
}

fn apply_date_bound(app: &mut App, prompt: PromptState, is_min: bool) {
	let input = prompt.input.trim().to_string();
	if input.is_empty() {
		if is_min {
			app.filter.min_date = None;
		} else {
			app.filter.max_date = None;
		}
		app.status = "date bound cleared".to_string();
		return;
	}

	match NaiveDate::parse_from_str(&input, "%Y-%m-%d") {
		Ok(day) => {
			if is_min {
				app.filter.min_date = Some(day);
			} else {
				app.filter.max_date = Some(day);
			}
			app.history_index = 0;
			app.status = format!("{} {day}", if is_min { "from" } else { "until" });
		}
		Err(err) => {
			app.status = format!("invalid date '{input}': {err}");
			app.mode = InputMode::Prompt(prompt);
		}
	}
}

fn handle_mouse(
	app: &mut App,
	mouse: MouseEvent,
	store_path: &Path,
	timer_start: &mut DateTime<Utc>,
) {
	let now = Utc::now();
	let elapsed = (now - *timer_start).num_seconds().max(0);

	match mouse.kind {
		MouseEventKind::Down(MouseButton::Left) => {
			if !inside_dial(app.dial_area, mouse.column, mouse.row) {
				return;
			}

			app.focus = FocusPane::Dial;
			let (x, y) = dial_point(app.dial_area, mouse.column, mouse.row);
			let update = app.dial.pointer_down(x, y, elapsed);
			apply_dial_update(app, update, store_path, timer_start, now);
		}
		MouseEventKind::Drag(MouseButton::Left) => {
			let (x, y) = dial_point(app.dial_area, mouse.column, mouse.row);
			let update = app.dial.pointer_move(x, y, elapsed);
			apply_dial_update(app, update, store_path, timer_start, now);
		}
		MouseEventKind::Up(_) => {
			app.dial.pointer_up();
			app.drag_minute = None;
		}
		_ => {}
	}
}

fn apply_dial_update(
	app: &mut App,
	update: Option<DialUpdate>,
	store_path: &Path,
	timer_start: &mut DateTime<Utc>,
	now: DateTime<Utc>,
) {
	let Some(update) = update else {
		return;
	};

	*timer_start = now - Duration::seconds(update.total_seconds);
	app.drag_minute = Some(update.minute_value);
	app.status = match save_timer_start(store_path, *timer_start) {
		Ok(()) => format!("timer set to {}", format_duration(update.total_seconds)),
		Err(err) => format!("error: {err}"),
	};
}

fn inside_dial(area: Rect, column: u16, row: u16) -> bool {
	column > area.x
		&& column + 1 < area.x + area.width
		&& row > area.y
		&& row + 1 < area.y + area.height
}

fn dial_point(area: Rect, column: u16, row: u16) -> (f64, f64) {
	let inner_width = f64::from(area.width.saturating_sub(2)).max(1.0);
	let inner_height = f64::from(area.height.saturating_sub(2)).max(1.0);
	let inner_x = f64::from(column) - f64::from(area.x) - 0.5;
	let inner_y = f64::from(row) - f64::from(area.y) - 0.5;

	(
		inner_x / inner_width * slider::DIAL_SIZE,
		inner_y / inner_height * slider::DIAL_SIZE,
	)
}

fn build_view(
	app: &App,
	entries: &[Entry],
	timer_start: DateTime<Utc>,
	now: DateTime<Utc>,
) -> ViewModel {
	let elapsed_seconds = (now - timer_start).num_seconds().max(0);
	let buckets = aggregate(entries, app.grouping, &app.filter);
	let history_rows = build_history_rows(&buckets, &app.expanded_tags);

	// while a drag is live the arc follows the pointer, not the timer
	let dial_arc_degrees = match app.drag_minute {
		Some(value) => {
			slider::radians_to_degrees(value / slider::MAX_MINUTES * std::f64::consts::TAU)
		}
		None => slider::idle_arc_degrees(elapsed_seconds),
	};

	ViewModel {
		history_rows,
		elapsed_seconds,
		dial_arc_degrees,
	}
}

fn build_history_rows(buckets: &[DateBucket], expanded_tags: &HashSet<String>) -> Vec<HistoryRow> {
	let mut rows = Vec::new();

	for bucket in buckets {
		rows.push(HistoryRow {
			line: Line::from(Span::styled(
				format!(
					"{} ~ {}",
					bucket.key.heading(),
					format_duration(bucket.duration)
				),
				Style::default().add_modifier(Modifier::BOLD),
			)),
			kind: HistoryRowKind::Bucket,
		});

		for tag_bucket in &bucket.tag_buckets {
			let key = format!("{}:{}", bucket.key.display_key(), tag_bucket.tag);
			let is_expanded = expanded_tags.contains(&key);
			rows.push(HistoryRow {
				line: Line::from(format!(
					"  {} {} ~ {}",
					if is_expanded { "[-]" } else { "[+]" },
					tag_bucket.tag,
					format_duration(tag_bucket.duration)
				)),
				kind: HistoryRowKind::Tag { key },
			});

			if !is_expanded {
				continue;
			}

			for entry in &tag_bucket.entries {
				rows.push(HistoryRow {
					line: Line::from(Span::styled(
						format!(
							"      {} {}",
							format_duration(entry.duration),
							entry.description
						),
						Style::default().fg(Color::DarkGray),
					)),
					kind: HistoryRowKind::Record,
				});
			}
		}
	}

	if rows.is_empty() {
		rows.push(HistoryRow {
			line: Line::from("(no entries match)"),
			kind: HistoryRowKind::Empty,
		});
	}

	rows
}

fn optional_text(input: &str) -> Option<String> {
	let value = input.trim();
	if value.is_empty() {
		None
	} else {
		Some(value.to_string())
	}
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
	History,
	Dial,
}

impl FocusPane {
	fn next(self) -> Self {
		match self {
			FocusPane::History => FocusPane::Dial,
			FocusPane::Dial => FocusPane::History,
		}
	}

	fn prev(self) -> Self {
		self.next()
	}
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input: String::new(),
			kind,
		}
	}
}

#[derive(Debug, Clone)]
enum PromptKind {
	FulltextFilter,
	MinDate,
	MaxDate,
	AddEntryDuration,
	AddEntryDescription { duration: String },
}

struct App {
	focus: FocusPane,
	grouping: GroupingMode,
	filter: EntryFilter,
	history_index: usize,
	expanded_tags: HashSet<String>,
	mode: InputMode,
	status: String,
	settings: Settings,
	suggestions: SuggestionSession,
	dial: DialController,
	drag_minute: Option<f64>,
	dial_area: Rect,
}

impl App {
	fn new(settings: Settings) -> Self {
		Self {
			focus: FocusPane::History,
			grouping: settings.grouping_mode(),
			filter: EntryFilter::default(),
			history_index: 0,
			expanded_tags: HashSet::new(),
			mode: InputMode::Normal,
			status: "Ready".to_string(),
			settings,
			suggestions: SuggestionSession::new(),
			dial: DialController::new(),
			drag_minute: None,
			dial_area: Rect::default(),
		}
	}

	fn clamp_selection(&mut self, view: &ViewModel) {
		if view.history_rows.is_empty() {
			self.history_index = 0;
		} else {
			self.history_index = self.history_index.min(view.history_rows.len() - 1);
		}
	}

	fn move_history_selection(&mut self, delta: i32, view: &ViewModel) {
		if view.history_rows.is_empty() {
			self.history_index = 0;
			return;
		}

		if delta > 0 {
			self.history_index =
				(self.history_index + delta as usize).min(view.history_rows.len() - 1);
		} else {
			self.history_index = self.history_index.saturating_sub(delta.unsigned_abs() as usize);
		}
	}
}

struct ViewModel {
	history_rows: Vec<HistoryRow>,
	elapsed_seconds: i64,
	dial_arc_degrees: f64,
}

struct HistoryRow {
	line: Line<'static>,
	kind: HistoryRowKind,
}

#[derive(Debug, Clone)]
enum HistoryRowKind {
	Empty,
	Bucket,
	Tag { key: String },
	Record,
}
