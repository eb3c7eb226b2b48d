//! Timeline command showing active/idle minutes and sessions.

use anyhow::Result;
use chrono::NaiveDate;

use dw_core::SubjectId;
use dw_engine::{Tracker, day_bounds};

use super::util::{day_or_today, format_minutes, parse_datetime};

/// Runs the timeline command over a day or an explicit window.
pub fn run(
    tracker: &Tracker,
    subject: &str,
    day: Option<NaiveDate>,
    start: Option<&str>,
    end: Option<&str>,
    json: bool,
) -> Result<()> {
    let subject = SubjectId::new(subject)?;
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (parse_datetime(start)?, parse_datetime(end)?),
        _ => day_bounds(day_or_today(day)),
    };
    anyhow::ensure!(end > start, "window end must be after its start");

    let summary = tracker.get_timeline(&subject, start, end)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "Timeline for {subject} ({} .. {})",
        start.to_rfc3339(),
        end.to_rfc3339()
    );
    println!("Active: {}", format_minutes(summary.active_minutes));
    println!("Idle:   {}", format_minutes(summary.idle_minutes));
    if summary.sessions.is_empty() {
        println!("No sessions.");
    } else {
        println!("Sessions:");
        for session in &summary.sessions {
            #[allow(clippy::cast_precision_loss)]
            let minutes = session.duration_seconds as f64 / 60.0;
            println!(
                "- {} .. {} ({})",
                session.start.to_rfc3339(),
                session.end.to_rfc3339(),
                format_minutes(minutes)
            );
        }
    }
    Ok(())
}
