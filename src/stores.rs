use std::env;
use std::fs;
use std::io::{Error, ErrorKind, Write};
use std::path::{Path, PathBuf};

const RECENT_STORES_FILE: &str = "recent_stores.txt";
const DEFAULT_STORE_FILE: &str = "entries.json";
const MAX_RECENT_STORES: usize = 50;

pub fn resolve_store_path(cli_path: Option<PathBuf>) -> Result<PathBuf, Error> {
	if let Some(path) = cli_path {
		return Ok(absolutize(path));
	}

	if let Some(path) = env::var_os("MINNOW_STORE") {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return Ok(absolutize(path));
		}
	}

	if let Ok(mut recent) = recent_stores(MAX_RECENT_STORES) {
		if let Some(path) = recent.drain(..).next() {
			return Ok(path);
		}
	}

	// a fresh install starts with an empty default store
	Ok(default_store_path())
}

pub fn default_store_path() -> PathBuf {
	state_dir().join(DEFAULT_STORE_FILE)
}

pub fn remember_store(path: &Path) -> Result<(), std::io::Error> {
	let path = absolutize(path.to_path_buf());
	let mut entries = recent_stores(MAX_RECENT_STORES)?;
	entries.retain(|entry| entry != &path);
	entries.insert(0, path);
	entries.truncate(MAX_RECENT_STORES);
	save_recent_stores(&entries)
}

pub fn recent_stores(limit: usize) -> Result<Vec<PathBuf>, std::io::Error> {
	let path = recent_stores_path();
	let raw = match fs::read_to_string(path) {
		Ok(raw) => raw,
		Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
		Err(err) => return Err(err),
	};

	let mut rows = Vec::new();
	for line in raw.lines() {
		let trimmed = line.trim();
		if trimmed.is_empty() {
			continue;
		}
		rows.push(PathBuf::from(trimmed));
		if rows.len() >= limit {
			break;
		}
	}

	Ok(rows)
}

fn save_recent_stores(entries: &[PathBuf]) -> Result<(), std::io::Error> {
	let state_dir = state_dir();
	fs::create_dir_all(&state_dir)?;

	let mut file = fs::File::create(recent_stores_path())?;
	for path in entries {
		writeln!(file, "{}", path.display())?;
	}

	Ok(())
}

fn recent_stores_path() -> PathBuf {
	state_dir().join(RECENT_STORES_FILE)
}

pub fn state_dir() -> PathBuf {
	if let Some(path) = env::var_os("MINNOW_STATE_DIR") {
		return PathBuf::from(path);
	}

	#[cfg(target_os = "windows")]
	{
		if let Some(path) = env::var_os("LOCALAPPDATA") {
			return PathBuf::from(path).join("minnow_timetracker");
		}
	}

	if let Some(path) = env::var_os("XDG_STATE_HOME") {
		return PathBuf::from(path).join("minnow_timetracker");
	}

	if let Some(path) = env::var_os("HOME") {
		return PathBuf::from(path)
			.join(".local")
			.join("state")
			.join("minnow_timetracker");
	}

	PathBuf::from(".minnow_timetracker")
}

fn absolutize(path: PathBuf) -> PathBuf {
	let path = if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	};

	if path.exists() {
		fs::canonicalize(&path).unwrap_or(path)
	} else {
		path
	}
}
