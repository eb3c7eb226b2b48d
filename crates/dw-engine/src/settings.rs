//! Runtime-tunable monitor settings.
//!
//! Settings are handed to the monitor loop as an immutable snapshot through
//! a [`SettingsSource`]; the loop re-reads the source on a fixed refresh
//! interval instead of consulting mutable global state.

use std::time::Duration;

/// One immutable snapshot of the monitor's tunables.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// How often the monitor loop polls activity and window context.
    pub poll_interval: Duration,
    /// How often the background worker flushes the movement buffer.
    pub flush_interval: Duration,
    /// No input for this long means the subject is idle.
    pub idle_threshold: Duration,
    /// Sustained idle for this long triggers an idle photo event.
    pub idle_photo_threshold: Duration,
    /// How often the monitor loop re-reads its settings source.
    pub settings_refresh: Duration,
    /// Fixed delay after a failed monitoring tick.
    pub error_backoff: Duration,
    /// Movement buffer size that forces an inline flush.
    pub batch_threshold: usize,
    /// Regex patterns marking a window context as non-work.
    pub non_work_patterns: Vec<String>,
    /// Substrings that exempt a context from the non-work patterns.
    pub work_whitelist: Vec<String>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            flush_interval: Duration::from_secs(10),
            idle_threshold: Duration::from_secs(30),
            idle_photo_threshold: Duration::from_secs(30),
            settings_refresh: Duration::from_secs(30),
            error_backoff: Duration::from_secs(10),
            batch_threshold: 50,
            non_work_patterns: crate::nonwork::default_patterns(),
            work_whitelist: Vec::new(),
        }
    }
}

/// Serves settings snapshots to the monitor loop.
pub trait SettingsSource: Send + Sync {
    fn snapshot(&self) -> MonitorSettings;
}

/// A settings source that always returns the same snapshot.
#[derive(Debug, Clone)]
pub struct FixedSettings(pub MonitorSettings);

impl SettingsSource for FixedSettings {
    fn snapshot(&self) -> MonitorSettings {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let settings = MonitorSettings::default();
        assert_eq!(settings.batch_threshold, 50);
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert!(!settings.non_work_patterns.is_empty());
    }
}
