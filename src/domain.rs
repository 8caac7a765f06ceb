use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use regex::Regex;
use serde::{Deserialize, Serialize};

const ID_LEN: usize = 8;

pub const FALLBACK_TAG: &str = "#other";
pub const UNSPECIFIED_DESCRIPTION: &str = "unspecified";

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#@^*]\w+").expect("tag pattern must compile"));
static LEADING_NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d*\.?\d*").expect("number pattern must compile"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub date: DateTime<Utc>,
    pub duration: i64,
    pub description: String,
    pub tags: Vec<String>,
}

impl Entry {
    pub fn new(date: DateTime<Utc>, raw_duration: &str, raw_description: &str) -> Self {
        let description = if raw_description.trim().is_empty() {
            UNSPECIFIED_DESCRIPTION.to_string()
        } else {
            raw_description.to_string()
        };

        Self {
            id: generate_id(),
            date,
            duration: parse_duration(raw_duration),
            tags: parse_tags(&description),
            description,
        }
    }

    pub fn normalized_tags(&self) -> Vec<String> {
        if self.tags.is_empty() {
            vec![FALLBACK_TAG.to_string()]
        } else {
            self.tags.clone()
        }
    }
}

pub fn generate_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

pub fn parse_duration(raw: &str) -> i64 {
    let value = LEADING_NUMBER_PATTERN
        .find(raw)
        .and_then(|number| number.as_str().parse::<f64>().ok())
        .unwrap_or(0.0);

    let seconds = if raw.contains('s') {
        value
    } else if raw.contains('m') {
        value * 60.0
    } else if raw.contains('h') {
        value * 3600.0
    } else {
        // bare numbers are minutes
        value * 60.0
    };

    (seconds.round() as i64).max(0)
}

pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{seconds}s")
    } else if seconds < 3600 {
        let minutes = (seconds as f64 / 60.0).round() as i64;
        format!("{minutes}m")
    } else {
        let rendered = format!("{:.2}", seconds as f64 / 3600.0);
        let hours = rendered.trim_end_matches('0').trim_end_matches('.');
        format!("{hours}h")
    }
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    TAG_PATTERN
        .find_iter(raw)
        .map(|tag| tag.as_str().to_string())
        .collect()
}
