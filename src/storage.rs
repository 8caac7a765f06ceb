use std::fmt::{Display, Formatter};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::Entry;

const TIMER_SIDECAR_SUFFIX: &str = ".timer";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
    TimestampDecode(chrono::ParseError),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse entry store: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode entry store: {err}"),
            StorageError::TimestampDecode(err) => {
                write!(f, "failed to parse timer start: {err}")
            }
        }
    }
}

impl std::error::Error for StorageError {}

pub fn load_entries(path: &Path) -> Result<Vec<Entry>, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&raw).map_err(StorageError::JsonDecode)
}

pub fn save_entries(path: &Path, entries: &[Entry]) -> Result<(), StorageError> {
    ensure_parent_dir(path)?;
    let payload = serde_json::to_string(entries).map_err(StorageError::JsonEncode)?;
    fs::write(path, payload).map_err(StorageError::Io)
}

pub fn prepend_entry(path: &Path, entry: Entry) -> Result<(), StorageError> {
    let mut entries = load_entries(path)?;
    // most recent first, like the list the UI renders
    entries.insert(0, entry);
    save_entries(path, &entries)
}

pub fn clear_entries(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StorageError::Io(err)),
    }
}

pub fn timer_path(store_path: &Path) -> PathBuf {
    let mut path = store_path.as_os_str().to_os_string();
    path.push(TIMER_SIDECAR_SUFFIX);
    PathBuf::from(path)
}

pub fn load_timer_start(store_path: &Path) -> Result<Option<DateTime<Utc>>, StorageError> {
    let raw = match fs::read_to_string(timer_path(store_path)) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(None);
    }

    DateTime::parse_from_rfc3339(raw.trim())
        .map(|start| Some(start.with_timezone(&Utc)))
        .map_err(StorageError::TimestampDecode)
}

pub fn save_timer_start(store_path: &Path, start: DateTime<Utc>) -> Result<(), StorageError> {
    let path = timer_path(store_path);
    ensure_parent_dir(&path)?;
    fs::write(path, start.to_rfc3339()).map_err(StorageError::Io)
}

pub fn backup_file_name(day: NaiveDate) -> String {
    format!("minnow_backup_{}.json", day.format("%Y-%m-%d"))
}

pub fn backup_entries(store_path: &Path, target: &Path) -> Result<(), StorageError> {
    // raw store content, copied verbatim; an unused store backs up empty
    let raw = match fs::read_to_string(store_path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => "[]".to_string(),
        Err(err) => return Err(StorageError::Io(err)),
    };

    ensure_parent_dir(target)?;
    fs::write(target, raw).map_err(StorageError::Io)
}

pub fn restore_entries(store_path: &Path, source: &Path) -> Result<(), StorageError> {
    // imported verbatim; malformed content surfaces on the next load
    let raw = fs::read_to_string(source).map_err(StorageError::Io)?;
    ensure_parent_dir(store_path)?;
    fs::write(store_path, raw).map_err(StorageError::Io)
}

fn ensure_parent_dir(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }
    Ok(())
}
