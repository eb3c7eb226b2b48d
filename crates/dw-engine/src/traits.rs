//! Seams to the engine's external collaborators.
//!
//! Capture of window context, webcam photos, and screenshots happens outside
//! this crate; the engine only sees these traits. All of them are
//! best-effort: a provider that has nothing to report returns empty values,
//! never an error, and must not block the caller for long.

use chrono::{DateTime, Utc};
use sysinfo::System;

use dw_core::Measurements;

/// A source of wall-clock timestamps.
///
/// Injected rather than read ambiently so aggregation and the monitor loop
/// can be driven deterministically in tests. Timestamps only need to be
/// monotonic enough for ordering; the segmenter clamps regressions.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The currently focused window, as far as the platform can tell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowContext {
    pub title: Option<String>,
    pub process_name: Option<String>,
}

/// Returns the focused window title and owning process name on demand.
pub trait ContextProvider: Send + Sync {
    /// Best-effort; may return empty/unknown values.
    fn active_context(&self) -> WindowContext;
}

/// A context provider for platforms without window detection wired up.
///
/// Always reports an unknown context; the normalizer maps the resulting
/// events to the `"unknown"` key.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnknownContext;

impl ContextProvider for UnknownContext {
    fn active_context(&self) -> WindowContext {
        WindowContext::default()
    }
}

/// Captures an artifact (screenshot or webcam photo) and returns its path.
pub trait ArtifactCapture: Send + Sync {
    /// Best-effort; `None` when the capture device is unavailable.
    fn capture(&self, reason: &str) -> Option<String>;
}

/// An artifact capturer that never produces anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl ArtifactCapture for NoCapture {
    fn capture(&self, _reason: &str) -> Option<String> {
        None
    }
}

/// Samples CPU and memory usage for event measurements.
pub trait MetricsProbe: Send {
    fn sample(&mut self) -> Measurements;
}

/// CPU/memory readings from the local system.
pub struct SystemMetrics {
    system: System,
}

impl SystemMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProbe for SystemMetrics {
    fn sample(&mut self) -> Measurements {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let mem_percent = if total == 0 {
            None
        } else {
            #[allow(clippy::cast_precision_loss)]
            let percent = self.system.used_memory() as f32 / total as f32 * 100.0;
            Some(percent)
        };
        Measurements {
            cpu_percent: Some(self.system.global_cpu_usage()),
            mem_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_context_reports_nothing() {
        let ctx = UnknownContext.active_context();
        assert_eq!(ctx, WindowContext::default());
    }

    #[test]
    fn no_capture_returns_none() {
        assert_eq!(NoCapture.capture("idle"), None);
    }
}
