use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::Entry;

static TOKEN_AT_CURSOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[#@^*]?\w+$").expect("token pattern must compile"));

pub fn ranked_tags(entries: &[Entry]) -> Vec<String> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for entry in entries {
        for tag in &entry.tags {
            if !counts.contains_key(tag) {
                order.push(tag.clone());
            }
            *counts.entry(tag.clone()).or_insert(0) += 1;
        }
    }

    // stable sort keeps first-seen order for equal counts
    order.sort_by_key(|tag| std::cmp::Reverse(counts[tag]));
    order
}

pub fn suggestions_for(partial: &str, ranked: &[String]) -> Vec<String> {
    let typed_with_marker = partial.starts_with(['#', '@', '^', '*']);

    ranked
        .iter()
        .filter(|tag| {
            if *tag == partial {
                return false;
            }
            if typed_with_marker {
                tag.starts_with(partial)
            } else {
                without_tag_marker(tag).starts_with(without_tag_marker(partial))
            }
        })
        .cloned()
        .collect()
}

fn without_tag_marker(value: &str) -> &str {
    value.strip_prefix(['#', '@', '^', '*']).unwrap_or(value)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub cursor: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SuggestionSession {
    starting_word: Option<String>,
    current_word: Option<String>,
    last_filled: Option<String>,
    prefix: String,
    suffix: String,
    cycling: bool,
    suggestions: Vec<String>,
}

impl SuggestionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, text: &str, cursor: usize, ranked: &[String]) {
        let to_cursor = &text[..cursor];
        let Some(token) = TOKEN_AT_CURSOR.find(to_cursor) else {
            self.reset();
            return;
        };

        // an edit anywhere but the token we just filled starts a new session
        if self.cycling && self.last_filled.as_deref() != Some(token.as_str()) {
            self.reset();
        }

        self.prefix = to_cursor[..token.start()].to_string();
        self.suffix = text[cursor..].to_string();
        let current = token.as_str().to_string();
        if !self.cycling {
            self.starting_word = Some(current.clone());
        }
        self.current_word = Some(current);

        let starting = self
            .starting_word
            .as_deref()
            .expect("starting word is set while a token matches");
        self.suggestions = suggestions_for(starting, ranked);
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn advance(&mut self) -> Option<Completion> {
        if self.suggestions.is_empty() {
            return None;
        }
        let current = self.current_word.clone()?;

        let mut filled = None;
        if !self.cycling {
            let common = longest_common_prefix(&self.suggestions);
            if common.len() > current.len() {
                filled = Some(common);
            }
        }
        self.cycling = true;

        let mut filled = match filled {
            Some(value) => value,
            None => {
                let next = match self.suggestions.iter().position(|tag| *tag == current) {
                    Some(index) if index + 1 < self.suggestions.len() => index + 1,
                    _ => 0,
                };
                self.suggestions[next].clone()
            }
        };

        self.last_filled = Some(filled.clone());

        // a lone candidate is a completed selection
        if self.suggestions.len() == 1 {
            filled.push(' ');
        }

        let cursor = self.prefix.len() + filled.len();
        let text = format!("{}{}{}", self.prefix, filled, self.suffix);
        Some(Completion { text, cursor })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn longest_common_prefix(values: &[String]) -> String {
    let mut prefix = match values.first() {
        Some(first) => first.clone(),
        None => return String::new(),
    };

    for value in &values[1..] {
        while !value.starts_with(prefix.as_str()) {
            prefix.pop();
        }
    }

    prefix
}
