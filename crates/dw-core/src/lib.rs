//! Core domain logic for the deskwatch activity engine.
//!
//! This crate contains the fundamental types and pure algorithms for:
//! - Timeline segmentation: sparse transition events → active/idle durations
//! - Application identity normalization: noisy titles → canonical keys
//! - Usage aggregation: per-application minutes, per subject and rolled up
//!
//! Everything here is free of I/O; storage and scheduling live in `dw-db`
//! and `dw-engine`.

pub mod event;
pub mod movement;
pub mod normalize;
pub mod timeline;
pub mod types;
pub mod usage;

pub use event::{ActivityClass, ActivitySample, EventKind, Measurements, UnknownEventKind};
pub use movement::{MovementKind, MovementSample, UnknownMovementKind};
pub use normalize::{display_label, normalize_key};
pub use timeline::{TimelineSummary, WorkSession, summarize};
pub use types::{SubjectId, ValidationError};
pub use usage::{AppUsage, aggregate, merge_usage};
