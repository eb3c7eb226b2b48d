//! Background monitoring workers.
//!
//! Three workers run on the tokio runtime, all stopped through one
//! cancellation token: the monitor loop (polls activity status and window
//! context, records transition events), the flush worker (drains the
//! movement buffer on an interval), and the status watcher (fires the
//! optional status-change callback). Worker failures are logged and the
//! worker continues on its next tick; nothing in here can take the process
//! down.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use dw_core::{ActivityClass, EventKind, MovementSample, SubjectId};

use crate::nonwork::NonWorkMatcher;
use crate::settings::{MonitorSettings, SettingsSource};
use crate::tracker::{EventDetails, Tracker};
use crate::traits::{
    ArtifactCapture, Clock, ContextProvider, MetricsProbe, NoCapture, SystemMetrics,
    UnknownContext,
};
use crate::{EngineError, MovementBuffer, lock};

/// Bounded wait for each worker to stop on shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How often the status watcher re-evaluates the activity status.
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

type StatusCallback = dyn Fn(ActivityClass) + Send + Sync;

/// Tracks the time of the last input signal for idle detection.
pub struct ActivityState {
    last_input: Mutex<DateTime<Utc>>,
}

impl ActivityState {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_input: Mutex::new(now),
        }
    }

    /// Marks input activity at the given time.
    pub fn touch(&self, now: DateTime<Utc>) {
        *lock(&self.last_input) = now;
    }

    /// Active if input was seen within the idle threshold.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>, idle_threshold: Duration) -> ActivityClass {
        let last = *lock(&self.last_input);
        let threshold =
            chrono::Duration::from_std(idle_threshold).unwrap_or(chrono::TimeDelta::MAX);
        if now.signed_duration_since(last) <= threshold {
            ActivityClass::Active
        } else {
            ActivityClass::Idle
        }
    }
}

/// Mutable sweep state owned by the monitor loop between ticks.
struct PollState {
    settings: MonitorSettings,
    matcher: NonWorkMatcher,
    refreshed_at: DateTime<Utc>,
    last_window: Option<String>,
    idle_since: Option<DateTime<Utc>>,
}

/// Per-subject monitoring agent.
///
/// Owns the movement buffer and the activity state; input-signal callbacks
/// feed [`record_signal`](Self::record_signal) while the background workers
/// poll context and record transition events through the shared tracker.
pub struct Monitor {
    tracker: Tracker,
    subject: SubjectId,
    buffer: Arc<MovementBuffer>,
    activity: ActivityState,
    settings: Arc<dyn SettingsSource>,
    context: Arc<dyn ContextProvider>,
    capture: Arc<dyn ArtifactCapture>,
    metrics: Mutex<Box<dyn MetricsProbe>>,
    on_status_change: Option<Box<StatusCallback>>,
    clock: Arc<dyn Clock>,
}

impl Monitor {
    /// Creates a monitor for one subject with placeholder collaborators.
    ///
    /// Swap in real providers with the `with_*` methods before starting.
    #[must_use]
    pub fn new(tracker: &Tracker, subject: SubjectId, settings: Arc<dyn SettingsSource>) -> Self {
        let snapshot = settings.snapshot();
        let clock = tracker.clock();
        Self {
            buffer: Arc::new(tracker.movement_buffer(subject.clone(), snapshot.batch_threshold)),
            activity: ActivityState::new(clock.now()),
            tracker: tracker.clone(),
            subject,
            settings,
            context: Arc::new(UnknownContext),
            capture: Arc::new(NoCapture),
            metrics: Mutex::new(Box::new(SystemMetrics::new())),
            on_status_change: None,
            clock,
        }
    }

    #[must_use]
    pub fn with_context_provider(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_artifact_capture(mut self, capture: Arc<dyn ArtifactCapture>) -> Self {
        self.capture = capture;
        self
    }

    #[must_use]
    pub fn with_metrics_probe(mut self, metrics: Box<dyn MetricsProbe>) -> Self {
        self.metrics = Mutex::new(metrics);
        self
    }

    #[must_use]
    pub fn with_status_callback(
        mut self,
        callback: impl Fn(ActivityClass) + Send + Sync + 'static,
    ) -> Self {
        self.on_status_change = Some(Box::new(callback));
        self
    }

    /// Entry point for asynchronous input-signal callbacks.
    ///
    /// Marks the subject active and buffers the sample; the buffer may
    /// flush inline at its size threshold. Must not be called from contexts
    /// that cannot tolerate a short store write.
    pub fn record_signal(&self, sample: MovementSample) -> Result<(), EngineError> {
        self.activity.touch(sample.timestamp);
        self.buffer.record(sample)
    }

    /// Registers the subject and spawns the background workers.
    ///
    /// Must be called from within a tokio runtime. The returned handle
    /// stops everything; see [`MonitorHandle::shutdown`].
    pub fn start(self: &Arc<Self>) -> Result<MonitorHandle, EngineError> {
        self.tracker.ensure_subject(&self.subject, None, None)?;
        let state = self.initial_state()?;

        let cancel = CancellationToken::new();
        let workers = vec![
            (
                "monitor",
                tokio::spawn(monitor_loop(
                    Arc::clone(self),
                    cancel.child_token(),
                    state,
                )),
            ),
            (
                "flush",
                tokio::spawn(flush_loop(Arc::clone(self), cancel.child_token())),
            ),
            (
                "status",
                tokio::spawn(status_loop(Arc::clone(self), cancel.child_token())),
            ),
        ];
        tracing::info!(subject = %self.subject, "monitor started");
        Ok(MonitorHandle {
            cancel,
            buffer: Arc::clone(&self.buffer),
            workers,
        })
    }

    fn initial_state(&self) -> Result<PollState, EngineError> {
        let settings = self.settings.snapshot();
        let matcher = NonWorkMatcher::new(&settings.non_work_patterns, &settings.work_whitelist)?;
        Ok(PollState {
            matcher,
            refreshed_at: self.clock.now(),
            last_window: None,
            idle_since: None,
            settings,
        })
    }

    /// One monitoring tick: refresh settings if stale, then classify and
    /// record.
    fn poll_once(&self, state: &mut PollState) -> Result<(), EngineError> {
        let now = self.clock.now();
        self.refresh_settings(state, now);

        let status = self
            .activity
            .status(now, state.settings.idle_threshold);
        let context = self.context.active_context();
        let measurements = lock(&self.metrics).sample();

        // Sustained idle triggers a webcam photo event, then re-arms.
        if status == ActivityClass::Idle {
            let since = *state.idle_since.get_or_insert(now);
            let photo_after = chrono::Duration::from_std(state.settings.idle_photo_threshold)
                .unwrap_or(chrono::TimeDelta::MAX);
            if now.signed_duration_since(since) >= photo_after {
                let artifact = self.capture.capture("idle");
                self.tracker.record_event(
                    &self.subject,
                    EventKind::IdlePhoto,
                    EventDetails {
                        window_title: context.title.clone(),
                        process_name: context.process_name.clone(),
                        measurements,
                        artifact_path: artifact,
                        note: Some("Idle threshold reached".to_string()),
                    },
                )?;
                state.idle_since = None;
            }
        } else {
            state.idle_since = None;
        }

        if context.title != state.last_window {
            state.last_window.clone_from(&context.title);
            let non_work = context
                .title
                .as_deref()
                .is_some_and(|t| state.matcher.is_non_work(t))
                || context
                    .process_name
                    .as_deref()
                    .is_some_and(|p| state.matcher.is_non_work(p));
            if non_work {
                let artifact = self.capture.capture("non_work");
                self.tracker.record_event(
                    &self.subject,
                    EventKind::NonWorkDetected,
                    EventDetails {
                        window_title: context.title,
                        process_name: context.process_name,
                        measurements,
                        artifact_path: artifact,
                        note: Some("Non-work content detected".to_string()),
                    },
                )?;
            } else {
                self.tracker.record_event(
                    &self.subject,
                    EventKind::WindowChange,
                    EventDetails {
                        window_title: context.title,
                        process_name: context.process_name,
                        measurements,
                        ..EventDetails::default()
                    },
                )?;
            }
        } else {
            let kind = match status {
                ActivityClass::Active => EventKind::Active,
                ActivityClass::Idle => EventKind::Idle,
            };
            self.tracker.record_event(
                &self.subject,
                kind,
                EventDetails {
                    window_title: context.title,
                    process_name: context.process_name,
                    measurements,
                    ..EventDetails::default()
                },
            )?;
        }

        Ok(())
    }

    fn refresh_settings(&self, state: &mut PollState, now: DateTime<Utc>) {
        let refresh_after = chrono::Duration::from_std(state.settings.settings_refresh)
            .unwrap_or(chrono::TimeDelta::MAX);
        if now.signed_duration_since(state.refreshed_at) < refresh_after {
            return;
        }
        state.refreshed_at = now;
        let settings = self.settings.snapshot();
        match NonWorkMatcher::new(&settings.non_work_patterns, &settings.work_whitelist) {
            Ok(matcher) => state.matcher = matcher,
            Err(err) => {
                tracing::warn!(error = %err, "refreshed non-work patterns invalid; keeping previous");
            }
        }
        state.settings = settings;
    }
}

/// Stops and joins the background workers.
pub struct MonitorHandle {
    cancel: CancellationToken,
    buffer: Arc<MovementBuffer>,
    workers: Vec<(&'static str, JoinHandle<()>)>,
}

impl MonitorHandle {
    /// Ordered shutdown: signal all loops to stop, force a final movement
    /// flush, then join each worker with a bounded timeout.
    ///
    /// The final flush is mandatory; a failure is logged but never silently
    /// dropped, and the batch stays in memory until the process exits.
    pub async fn shutdown(self) {
        self.cancel.cancel();

        match self.buffer.flush() {
            Ok(0) => {}
            Ok(count) => tracing::info!(samples = count, "final movement flush"),
            Err(err) => tracing::error!(error = %err, "final movement flush failed"),
        }

        for (name, handle) in self.workers {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(worker = name, error = %err, "worker join failed"),
                Err(_) => tracing::warn!(worker = name, "worker did not stop within timeout"),
            }
        }
        tracing::info!("monitor stopped");
    }
}

async fn monitor_loop(monitor: Arc<Monitor>, cancel: CancellationToken, mut state: PollState) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(state.settings.poll_interval) => {}
        }
        if let Err(err) = monitor.poll_once(&mut state) {
            tracing::error!(error = %err, "monitoring tick failed; backing off");
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(state.settings.error_backoff) => {}
            }
        }
    }
    tracing::debug!("monitor loop stopped");
}

async fn flush_loop(monitor: Arc<Monitor>, cancel: CancellationToken) {
    let interval = monitor.settings.snapshot().flush_interval;
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
        match monitor.buffer.flush() {
            Ok(0) => {}
            Ok(count) => tracing::debug!(samples = count, "movement batch flushed"),
            Err(err) => {
                tracing::warn!(error = %err, "movement flush failed; batch retained for retry");
            }
        }
    }
    tracing::debug!("flush worker stopped");
}

async fn status_loop(monitor: Arc<Monitor>, cancel: CancellationToken) {
    let mut current = ActivityClass::Active;
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(STATUS_POLL_INTERVAL) => {}
        }
        let settings = monitor.settings.snapshot();
        let status = monitor
            .activity
            .status(monitor.clock.now(), settings.idle_threshold);
        if status != current {
            current = status;
            tracing::debug!(?status, "activity status changed");
            if let Some(callback) = &monitor.on_status_change {
                callback(status);
            }
        }
    }
    tracing::debug!("status watcher stopped");
}
