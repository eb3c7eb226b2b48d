//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use dw_engine::MonitorSettings;

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// How often the monitor polls activity and window context.
    pub poll_interval_seconds: u64,

    /// How often the movement buffer is flushed.
    pub flush_interval_seconds: u64,

    /// No input for this long means idle.
    pub idle_threshold_seconds: u64,

    /// Sustained idle for this long triggers an idle photo event.
    pub idle_photo_threshold_seconds: u64,

    /// How often the monitor re-reads its settings.
    pub settings_refresh_seconds: u64,

    /// Movement buffer size that forces an inline flush.
    pub movement_batch_size: usize,

    /// Regex patterns marking a window context as non-work.
    pub non_work_patterns: Vec<String>,

    /// Substrings exempting a context from the non-work patterns.
    pub work_whitelist: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("poll_interval_seconds", &self.poll_interval_seconds)
            .field("idle_threshold_seconds", &self.idle_threshold_seconds)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let defaults = MonitorSettings::default();
        Self {
            database_path: data_dir.join("dw.db"),
            poll_interval_seconds: defaults.poll_interval.as_secs(),
            flush_interval_seconds: defaults.flush_interval.as_secs(),
            idle_threshold_seconds: defaults.idle_threshold.as_secs(),
            idle_photo_threshold_seconds: defaults.idle_photo_threshold.as_secs(),
            settings_refresh_seconds: defaults.settings_refresh.as_secs(),
            movement_batch_size: defaults.batch_threshold,
            non_work_patterns: defaults.non_work_patterns,
            work_whitelist: defaults.work_whitelist,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (DW_*)
        figment = figment.merge(Env::prefixed("DW_"));

        figment.extract()
    }

    /// The monitor settings snapshot this configuration describes.
    #[must_use]
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            poll_interval: Duration::from_secs(self.poll_interval_seconds),
            flush_interval: Duration::from_secs(self.flush_interval_seconds),
            idle_threshold: Duration::from_secs(self.idle_threshold_seconds),
            idle_photo_threshold: Duration::from_secs(self.idle_photo_threshold_seconds),
            settings_refresh: Duration::from_secs(self.settings_refresh_seconds),
            batch_threshold: self.movement_batch_size,
            non_work_patterns: self.non_work_patterns.clone(),
            work_whitelist: self.work_whitelist.clone(),
            ..MonitorSettings::default()
        }
    }
}

/// Returns the platform-specific config directory for dw.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("deskwatch"))
}

/// Returns the platform-specific data directory for dw.
///
/// On Linux: `~/.local/share/deskwatch`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("deskwatch"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_returns_some() {
        assert!(dirs_data_path().is_some());
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("dw.db"));
    }

    #[test]
    fn test_monitor_settings_reflect_config() {
        let config = Config {
            idle_threshold_seconds: 45,
            movement_batch_size: 10,
            ..Config::default()
        };
        let settings = config.monitor_settings();
        assert_eq!(settings.idle_threshold, Duration::from_secs(45));
        assert_eq!(settings.batch_threshold, 10);
    }
}
