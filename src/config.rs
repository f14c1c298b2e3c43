//! Application-level configuration loading, including the scheduler cadence and quick match settings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use time::UtcOffset;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "RUNNING_MATE_CONFIG_PATH";
const DEFAULT_DEACTIVATION_INTERVAL_SECS: u64 = 5;
/// Offset of the reference timezone used for the daily quick match rotation.
const DEFAULT_UTC_OFFSET_HOURS: i8 = 9;
const DEFAULT_QUICK_MATCH_TITLE: &str = "Quick Run";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Period of the expired-group deactivation sweep.
    pub deactivation_interval: Duration,
    /// Quick match rotation settings.
    pub quick_match: QuickMatchConfig,
}

#[derive(Debug, Clone)]
/// Settings of the always-on quick match group.
pub struct QuickMatchConfig {
    /// Timezone whose midnight triggers the rotation.
    pub utc_offset: UtcOffset,
    /// Title given to generated groups.
    pub title: String,
    /// Rotate once at startup so a quick match group exists immediately.
    pub rotate_on_startup: bool,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        deactivation_interval_secs = app_config.deactivation_interval.as_secs(),
                        utc_offset = %app_config.quick_match.utc_offset,
                        "loaded scheduler settings from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            deactivation_interval: Duration::from_secs(DEFAULT_DEACTIVATION_INTERVAL_SECS),
            quick_match: QuickMatchConfig::default(),
        }
    }
}

impl Default for QuickMatchConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_offset(),
            title: DEFAULT_QUICK_MATCH_TITLE.to_owned(),
            rotate_on_startup: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    deactivation_interval_secs: Option<u64>,
    quick_match: RawQuickMatch,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the `quick_match` section.
struct RawQuickMatch {
    utc_offset_hours: Option<i8>,
    title: Option<String>,
    rotate_on_startup: Option<bool>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let deactivation_interval = match value.deactivation_interval_secs {
            Some(0) => {
                warn!("deactivation_interval_secs must be positive; using default");
                Duration::from_secs(DEFAULT_DEACTIVATION_INTERVAL_SECS)
            }
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_DEACTIVATION_INTERVAL_SECS),
        };

        Self {
            deactivation_interval,
            quick_match: value.quick_match.into(),
        }
    }
}

impl From<RawQuickMatch> for QuickMatchConfig {
    fn from(value: RawQuickMatch) -> Self {
        let utc_offset = match value.utc_offset_hours {
            Some(hours) => UtcOffset::from_hms(hours, 0, 0).unwrap_or_else(|err| {
                warn!(hours, error = %err, "invalid utc_offset_hours; using default");
                default_offset()
            }),
            None => default_offset(),
        };
        let title = value
            .title
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUICK_MATCH_TITLE.to_owned());

        Self {
            utc_offset,
            title,
            rotate_on_startup: value.rotate_on_startup.unwrap_or(true),
        }
    }
}

fn default_offset() -> UtcOffset {
    UtcOffset::from_hms(DEFAULT_UTC_OFFSET_HOURS, 0, 0).unwrap_or(UtcOffset::UTC)
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: AppConfig = serde_json::from_str::<RawConfig>("{}").unwrap().into();
        assert_eq!(config.deactivation_interval, Duration::from_secs(5));
        assert_eq!(config.quick_match.utc_offset.whole_hours(), 9);
        assert_eq!(config.quick_match.title, "Quick Run");
        assert!(config.quick_match.rotate_on_startup);
    }

    #[test]
    fn overrides_are_applied() {
        let raw = r#"{
            "deactivation_interval_secs": 30,
            "quick_match": { "utc_offset_hours": -5, "title": "Daily Dash", "rotate_on_startup": false }
        }"#;
        let config: AppConfig = serde_json::from_str::<RawConfig>(raw).unwrap().into();
        assert_eq!(config.deactivation_interval, Duration::from_secs(30));
        assert_eq!(config.quick_match.utc_offset.whole_hours(), -5);
        assert_eq!(config.quick_match.title, "Daily Dash");
        assert!(!config.quick_match.rotate_on_startup);
    }

    #[test]
    fn out_of_range_values_fall_back() {
        let raw = r#"{ "deactivation_interval_secs": 0, "quick_match": { "utc_offset_hours": 40, "title": " " } }"#;
        let config: AppConfig = serde_json::from_str::<RawConfig>(raw).unwrap().into();
        assert_eq!(config.deactivation_interval, Duration::from_secs(5));
        assert_eq!(config.quick_match.utc_offset.whole_hours(), 9);
        assert_eq!(config.quick_match.title, "Quick Run");
    }
}
