//! Ingestion, scheduling, and the query facade for the deskwatch engine.
//!
//! This crate owns everything concurrent: the movement ingestion buffer, the
//! background monitoring workers, and the [`Tracker`] facade that external
//! consumers (CLI, dashboards) call. The pure reconstruction algorithms live
//! in `dw-core`; durable storage lives in `dw-db`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

mod buffer;
mod error;
mod monitor;
mod nonwork;
mod settings;
mod tracker;
mod traits;

pub use buffer::MovementBuffer;
pub use error::EngineError;
pub use monitor::{ActivityState, Monitor, MonitorHandle};
pub use nonwork::NonWorkMatcher;
pub use settings::{FixedSettings, MonitorSettings, SettingsSource};
pub use tracker::{EventDetails, SubjectActivity, SubjectStatus, Tracker, day_bounds};
pub use traits::{
    ArtifactCapture, Clock, ContextProvider, MetricsProbe, NoCapture, SystemClock, SystemMetrics,
    UnknownContext, WindowContext,
};

/// The single writer lock shared by every path that mutates the store.
pub(crate) type SharedDb = Arc<Mutex<dw_db::Database>>;

/// Locks a mutex, recovering the guard if a holder panicked.
///
/// The protected state (a pending batch, a connection) stays usable after a
/// panic; poisoning is not treated as corruption.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
