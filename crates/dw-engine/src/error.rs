//! Engine error type.

use thiserror::Error;

/// Errors surfaced by the engine to its callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The underlying event store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] dw_db::DbError),

    /// A configured non-work pattern failed to compile.
    #[error("invalid non-work pattern: {0}")]
    Pattern(#[from] regex::Error),
}
