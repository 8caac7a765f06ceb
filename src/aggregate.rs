use std::collections::HashMap;

use chrono::{Datelike, Duration, Local, NaiveDate};

use crate::domain::Entry;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingMode {
    None,
    Day,
    Week,
    Month,
}

impl GroupingMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "none" => Some(GroupingMode::None),
            "day" => Some(GroupingMode::Day),
            "week" => Some(GroupingMode::Week),
            "month" => Some(GroupingMode::Month),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GroupingMode::None => "none",
            GroupingMode::Day => "day",
            GroupingMode::Week => "week",
            GroupingMode::Month => "month",
        }
    }

    pub fn next(self) -> Self {
        match self {
            GroupingMode::None => GroupingMode::Day,
            GroupingMode::Day => GroupingMode::Week,
            GroupingMode::Week => GroupingMode::Month,
            GroupingMode::Month => GroupingMode::None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub fulltext: Option<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
}

impl EntryFilter {
    pub fn is_empty(&self) -> bool {
        self.fulltext.is_none() && self.min_date.is_none() && self.max_date.is_none()
    }

    fn matches(&self, entry: &Entry) -> bool {
        if let Some(fulltext) = &self.fulltext {
            if !entry.description.contains(fulltext.as_str()) {
                return false;
            }
        }

        let local_time = entry.date.with_timezone(&Local).naive_local();
        if let Some(min_date) = self.min_date {
            let lower = min_date.and_hms_opt(0, 0, 0).expect("midnight must be valid");
            if local_time < lower {
                return false;
            }
        }
        if let Some(max_date) = self.max_date {
            // inclusive upper bound, normalized to end of day
            let upper = max_date
                .and_hms_opt(23, 59, 59)
                .expect("end of day must be valid");
            if local_time > upper {
                return false;
            }
        }

        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    All,
    Day(NaiveDate),
    Week { year: i32, week: u32 },
    Month { year: i32, month: u32 },
}

impl GroupKey {
    pub fn display_key(&self) -> String {
        match self {
            GroupKey::All => "all time".to_string(),
            GroupKey::Day(date) => date.format("%Y-%m-%d").to_string(),
            GroupKey::Week { year, week } => format!("{year}{week}"),
            GroupKey::Month { year, month } => {
                format!("{} {year}", MONTH_NAMES[(*month as usize) - 1])
            }
        }
    }

    pub fn heading(&self) -> String {
        match self {
            GroupKey::All => "all time".to_string(),
            GroupKey::Day(date) => format!(
                "{} - {}",
                date.format("%Y-%m-%d"),
                date.format("%A").to_string().to_lowercase()
            ),
            GroupKey::Week { year, week } => {
                let span = week_boundary_dates(*year, *week);
                format!(
                    "{} - {}, week {week}",
                    span.first.format("%Y-%m-%d"),
                    span.last.format("%Y-%m-%d")
                )
            }
            GroupKey::Month { .. } => self.display_key(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagBucket {
    pub tag: String,
    pub duration: i64,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
pub struct DateBucket {
    pub key: GroupKey,
    pub duration: i64,
    pub tag_buckets: Vec<TagBucket>,
}

pub fn aggregate(entries: &[Entry], mode: GroupingMode, filter: &EntryFilter) -> Vec<DateBucket> {
    let mut keyed: Vec<(GroupKey, Vec<&Entry>)> = Vec::new();
    let mut positions: HashMap<GroupKey, usize> = HashMap::new();

    for entry in entries.iter().filter(|entry| filter.matches(entry)) {
        let key = group_key(entry, mode);
        let index = match positions.get(&key) {
            Some(index) => *index,
            None => {
                keyed.push((key.clone(), Vec::new()));
                positions.insert(key, keyed.len() - 1);
                keyed.len() - 1
            }
        };
        keyed[index].1.push(entry);
    }

    let mut buckets = keyed
        .into_iter()
        .map(|(key, members)| build_bucket(key, &members))
        .collect::<Vec<_>>();
    buckets.sort_by(|left, right| right.key.cmp(&left.key));
    buckets
}

fn build_bucket(key: GroupKey, members: &[&Entry]) -> DateBucket {
    let mut tag_order: Vec<String> = Vec::new();
    let mut by_tag: HashMap<String, TagBucket> = HashMap::new();
    let mut total = 0i64;

    for entry in members {
        // counted once per entry, regardless of how many tags it carries
        total += entry.duration;

        for tag in entry.normalized_tags() {
            if !by_tag.contains_key(&tag) {
                tag_order.push(tag.clone());
                by_tag.insert(
                    tag.clone(),
                    TagBucket {
                        tag: tag.clone(),
                        duration: 0,
                        entries: Vec::new(),
                    },
                );
            }

            let bucket = by_tag.get_mut(&tag).expect("tag bucket was just inserted");
            bucket.duration += entry.duration;
            bucket.entries.push((*entry).clone());
        }
    }

    let mut tag_buckets = tag_order
        .into_iter()
        .map(|tag| by_tag.remove(&tag).expect("tag bucket must exist"))
        .collect::<Vec<_>>();
    tag_buckets.sort_by_key(|bucket| std::cmp::Reverse(bucket.duration));

    DateBucket {
        key,
        duration: total,
        tag_buckets,
    }
}

fn group_key(entry: &Entry, mode: GroupingMode) -> GroupKey {
    let local_date = entry.date.with_timezone(&Local).date_naive();
    match mode {
        GroupingMode::None => GroupKey::All,
        GroupingMode::Day => GroupKey::Day(local_date),
        GroupingMode::Week => {
            let (year, week) = week_key(local_date);
            GroupKey::Week { year, week }
        }
        GroupingMode::Month => GroupKey::Month {
            year: local_date.year(),
            month: local_date.month(),
        },
    }
}

pub fn week_key(date: NaiveDate) -> (i32, u32) {
    // ISO weeks start Monday; the Thursday decides which year the week
    // belongs to. Week numbers are kept zero-based.
    let offset = 4 - date.weekday().number_from_monday() as i64;
    let thursday = date + Duration::days(offset);
    (thursday.year(), thursday.iso_week().week() - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekSpan {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

pub fn week_boundary_dates(year: i32, week: u32) -> WeekSpan {
    // Approximation matched to the zero-based week key: day (week * 7) of
    // January, snapped back to the Monday of its calendar week.
    let jan_first = NaiveDate::from_ymd_opt(year, 1, 1).expect("january 1st must be valid");
    let approx = jan_first + Duration::days(week as i64 * 7 - 1);
    let first = approx - Duration::days(approx.weekday().num_days_from_sunday() as i64)
        + Duration::days(1);

    WeekSpan {
        first,
        last: first + Duration::days(6),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Local, NaiveDate, TimeZone, Utc};

    use crate::domain::Entry;

    use super::{
        DateBucket, EntryFilter, GroupKey, GroupingMode, aggregate, week_boundary_dates, week_key,
    };

    fn entry_at(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        duration: &str,
        description: &str,
    ) -> Entry {
        let date = Local
            .with_ymd_and_hms(year, month, day, hour, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        Entry::new(date, duration, description)
    }

    fn tag_duration(bucket: &DateBucket, tag: &str) -> i64 {
        bucket
            .tag_buckets
            .iter()
            .find(|tag_bucket| tag_bucket.tag == tag)
            .map(|tag_bucket| tag_bucket.duration)
            .expect("tag bucket should exist")
    }

    #[test]
    fn groups_by_day_with_multi_tag_entries() {
        let entries = vec![
            entry_at(2024, 1, 8, 9, "1h", "rigging #work"),
            entry_at(2024, 1, 8, 14, "30m", "project sync #work #meeting"),
        ];

        let buckets = aggregate(&entries, GroupingMode::Day, &EntryFilter::default());
        assert_eq!(buckets.len(), 1);

        let bucket = &buckets[0];
        assert_eq!(bucket.key.display_key(), "2024-01-08");
        assert_eq!(bucket.duration, 5400);
        assert_eq!(tag_duration(bucket, "#work"), 5400);
        assert_eq!(tag_duration(bucket, "#meeting"), 1800);
    }

    #[test]
    fn day_buckets_sort_most_recent_first() {
        let entries = vec![
            entry_at(2024, 1, 6, 9, "10m", "#a"),
            entry_at(2024, 1, 8, 9, "10m", "#b"),
            entry_at(2024, 1, 7, 9, "10m", "#c"),
        ];

        let buckets = aggregate(&entries, GroupingMode::Day, &EntryFilter::default());
        let keys = buckets
            .iter()
            .map(|bucket| bucket.key.display_key())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["2024-01-08", "2024-01-07", "2024-01-06"]);
    }

    #[test]
    fn tag_buckets_sort_by_descending_duration_with_stable_ties() {
        let entries = vec![
            entry_at(2024, 1, 8, 9, "10m", "#small"),
            entry_at(2024, 1, 8, 10, "1h", "#big"),
            entry_at(2024, 1, 8, 11, "10m", "#also_small"),
        ];

        let buckets = aggregate(&entries, GroupingMode::Day, &EntryFilter::default());
        let tags = buckets[0]
            .tag_buckets
            .iter()
            .map(|tag_bucket| tag_bucket.tag.as_str())
            .collect::<Vec<_>>();
        assert_eq!(tags, vec!["#big", "#small", "#also_small"]);
    }

    #[test]
    fn single_tag_buckets_conserve_the_day_total() {
        let entries = vec![
            entry_at(2024, 1, 8, 9, "1h", "#work"),
            entry_at(2024, 1, 8, 10, "20m", "#errands"),
            entry_at(2024, 1, 8, 11, "5m", "untagged break"),
        ];

        let buckets = aggregate(&entries, GroupingMode::Day, &EntryFilter::default());
        let bucket = &buckets[0];
        let tag_sum = bucket
            .tag_buckets
            .iter()
            .map(|tag_bucket| tag_bucket.duration)
            .sum::<i64>();
        assert_eq!(tag_sum, bucket.duration);
        assert_eq!(tag_duration(bucket, "#other"), 300);
    }

    #[test]
    fn no_grouping_yields_one_bucket() {
        let entries = vec![
            entry_at(2024, 1, 6, 9, "1h", "#a"),
            entry_at(2024, 3, 8, 9, "1h", "#b"),
        ];

        let buckets = aggregate(&entries, GroupingMode::None, &EntryFilter::default());
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key, GroupKey::All);
        assert_eq!(buckets[0].key.heading(), "all time");
        assert_eq!(buckets[0].duration, 7200);
    }

    #[test]
    fn fulltext_filter_matches_substrings() {
        let entries = vec![
            entry_at(2024, 1, 8, 9, "1h", "patched the hull #work"),
            entry_at(2024, 1, 8, 10, "1h", "lunch #break"),
        ];

        let filter = EntryFilter {
            fulltext: Some("hull".to_string()),
            ..EntryFilter::default()
        };
        let buckets = aggregate(&entries, GroupingMode::None, &filter);
        assert_eq!(buckets[0].duration, 3600);
    }

    #[test]
    fn date_bounds_are_inclusive_and_max_extends_to_end_of_day() {
        let entries = vec![
            entry_at(2024, 1, 7, 12, "10m", "#before"),
            entry_at(2024, 1, 8, 0, "10m", "#on_min"),
            entry_at(2024, 1, 9, 23, "10m", "#on_max"),
            entry_at(2024, 1, 10, 1, "10m", "#after"),
        ];

        let filter = EntryFilter {
            fulltext: None,
            min_date: NaiveDate::from_ymd_opt(2024, 1, 8),
            max_date: NaiveDate::from_ymd_opt(2024, 1, 9),
        };
        let buckets = aggregate(&entries, GroupingMode::Day, &filter);
        let keys = buckets
            .iter()
            .map(|bucket| bucket.key.display_key())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["2024-01-09", "2024-01-08"]);
    }

    #[test]
    fn week_keys_are_zero_based_and_year_prefixed() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 8).expect("date must be valid");
        assert_eq!(week_key(monday), (2024, 1));

        let new_year = NaiveDate::from_ymd_opt(2025, 1, 1).expect("date must be valid");
        assert_eq!(week_key(new_year), (2025, 0));

        assert_eq!(
            GroupKey::Week { year: 2024, week: 1 }.display_key(),
            "20241"
        );
    }

    #[test]
    fn week_boundaries_match_the_week_key() {
        let span = week_boundary_dates(2024, 1);
        assert_eq!(span.first, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(span.last, NaiveDate::from_ymd_opt(2024, 1, 14).unwrap());

        let wrapped = week_boundary_dates(2025, 0);
        assert_eq!(wrapped.first, NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
        assert_eq!(wrapped.last, NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
    }

    #[test]
    fn week_buckets_sort_by_year_then_week() {
        let entries = vec![
            entry_at(2024, 1, 3, 9, "10m", "#w0"),
            entry_at(2024, 3, 6, 9, "10m", "#w9"),
            entry_at(2024, 3, 13, 9, "10m", "#w10"),
        ];

        let buckets = aggregate(&entries, GroupingMode::Week, &EntryFilter::default());
        let keys = buckets
            .iter()
            .map(|bucket| bucket.key.clone())
            .collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                GroupKey::Week { year: 2024, week: 10 },
                GroupKey::Week { year: 2024, week: 9 },
                GroupKey::Week { year: 2024, week: 0 },
            ]
        );
    }

    #[test]
    fn month_buckets_use_lowercase_names_and_sort_across_years() {
        let entries = vec![
            entry_at(2024, 12, 20, 9, "10m", "#past"),
            entry_at(2025, 1, 5, 9, "10m", "#recent"),
        ];

        let buckets = aggregate(&entries, GroupingMode::Month, &EntryFilter::default());
        let keys = buckets
            .iter()
            .map(|bucket| bucket.key.display_key())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["january 2025", "december 2024"]);
    }

    #[test]
    fn aggregation_does_not_mutate_input_order() {
        let entries = vec![
            entry_at(2024, 1, 8, 9, "1h", "#work"),
            entry_at(2024, 1, 7, 9, "1h", "#work"),
        ];
        let snapshot = entries
            .iter()
            .map(|entry| entry.id.clone())
            .collect::<Vec<_>>();

        let _ = aggregate(&entries, GroupingMode::Day, &EntryFilter::default());
        let after = entries
            .iter()
            .map(|entry| entry.id.clone())
            .collect::<Vec<_>>();
        assert_eq!(snapshot, after);
    }
}
