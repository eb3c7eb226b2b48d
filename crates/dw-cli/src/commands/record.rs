//! Record command for appending a single transition event.

use anyhow::{Context, Result};

use dw_core::{EventKind, SubjectId};
use dw_engine::{EventDetails, Tracker};

/// Options for the recorded event.
pub struct RecordArgs<'a> {
    pub subject: &'a str,
    pub kind: &'a str,
    pub title: Option<String>,
    pub process: Option<String>,
    pub artifact: Option<String>,
    pub note: Option<String>,
}

/// Runs the record command, printing the store-assigned event id.
pub fn run(tracker: &Tracker, args: RecordArgs<'_>) -> Result<()> {
    let subject = SubjectId::new(args.subject)?;
    // Unknown kinds are rejected here, at the ingestion boundary.
    let kind: EventKind = args.kind.parse().context(
        "expected one of: active, idle, window_change, non_work_detected, idle_photo",
    )?;

    tracker.ensure_subject(&subject, None, None)?;
    let id = tracker.record_event(
        &subject,
        kind,
        EventDetails {
            window_title: args.title,
            process_name: args.process,
            artifact_path: args.artifact,
            note: args.note,
            ..EventDetails::default()
        },
    )?;

    println!("Event {id} recorded for {subject}");
    Ok(())
}
