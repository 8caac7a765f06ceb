use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::aggregate::GroupingMode;
use crate::stores::state_dir;

const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub default_grouping: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_grouping: GroupingMode::Day.name().to_string(),
        }
    }
}

impl Settings {
    pub fn grouping_mode(&self) -> GroupingMode {
        GroupingMode::from_name(&self.default_grouping).unwrap_or(GroupingMode::Day)
    }

    pub fn set_grouping_mode(&mut self, mode: GroupingMode) {
        self.default_grouping = mode.name().to_string();
    }
}

pub fn settings_path() -> PathBuf {
    state_dir().join(SETTINGS_FILE)
}

pub fn load_settings() -> Result<Settings, String> {
    let raw = match fs::read_to_string(settings_path()) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Settings::default()),
        Err(err) => return Err(format!("failed to read settings: {err}")),
    };

    toml::from_str(&raw).map_err(|err| format!("failed to parse settings: {err}"))
}

pub fn save_settings(settings: &Settings) -> Result<(), String> {
    let dir = state_dir();
    fs::create_dir_all(&dir).map_err(|err| format!("failed to create state dir: {err}"))?;

    let payload = toml::to_string_pretty(settings)
        .map_err(|err| format!("failed to encode settings: {err}"))?;
    fs::write(settings_path(), payload).map_err(|err| format!("failed to write settings: {err}"))
}

#[cfg(test)]
mod tests {
    use crate::aggregate::GroupingMode;

    use super::Settings;

    #[test]
    fn defaults_to_day_grouping() {
        assert_eq!(Settings::default().grouping_mode(), GroupingMode::Day);
    }

    #[test]
    fn parses_grouping_from_toml() {
        let settings: Settings =
            toml::from_str("default_grouping = \"week\"").expect("settings should parse");
        assert_eq!(settings.grouping_mode(), GroupingMode::Week);
    }

    #[test]
    fn unknown_grouping_falls_back_to_day() {
        let settings = Settings {
            default_grouping: "fortnight".to_string(),
        };
        assert_eq!(settings.grouping_mode(), GroupingMode::Day);
    }

    #[test]
    fn grouping_mode_round_trips() {
        let mut settings = Settings::default();
        settings.set_grouping_mode(GroupingMode::Month);
        let encoded = toml::to_string_pretty(&settings).expect("settings should encode");
        let decoded: Settings = toml::from_str(&encoded).expect("settings should parse");
        assert_eq!(decoded.grouping_mode(), GroupingMode::Month);
    }
}
