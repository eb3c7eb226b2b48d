//! Movement command for recording input samples.

use anyhow::{Context, Result};
use chrono::Utc;

use dw_core::{MovementKind, MovementSample, SubjectId};
use dw_engine::Tracker;

use crate::Config;

/// Records one movement sample and flushes the batch immediately, so the
/// one-shot invocation leaves nothing in memory.
pub fn run(
    tracker: &Tracker,
    config: &Config,
    subject: &str,
    kind: &str,
    detail: &str,
    distance: f64,
) -> Result<()> {
    let subject = SubjectId::new(subject)?;
    let kind: MovementKind = kind
        .parse()
        .context("expected one of: key_press, mouse_move, mouse_click")?;

    tracker.ensure_subject(&subject, None, None)?;
    let buffer = tracker.movement_buffer(subject.clone(), config.movement_batch_size);
    buffer.record(MovementSample::new(Utc::now(), kind, detail, distance))?;
    let written = buffer.flush()?;

    println!("{written} movement sample(s) flushed for {subject}");
    Ok(())
}
