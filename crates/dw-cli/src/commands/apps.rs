//! Apps command showing per-application usage for one subject.

use anyhow::Result;
use chrono::NaiveDate;

use dw_core::{AppUsage, SubjectId};
use dw_engine::Tracker;

use super::util::{day_or_today, format_minutes};

/// Runs the apps command.
pub fn run(
    tracker: &Tracker,
    subject: &str,
    day: Option<NaiveDate>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let subject = SubjectId::new(subject)?;
    let usage = tracker.get_app_usage(&subject, day_or_today(day))?;
    print_usage(&usage, limit, json)
}

/// Prints a ranked usage list, shared with the company command.
pub fn print_usage(usage: &[AppUsage], limit: Option<usize>, json: bool) -> Result<()> {
    let shown = limit.unwrap_or(usage.len()).min(usage.len());
    let usage = &usage[..shown];

    if json {
        println!("{}", serde_json::to_string_pretty(usage)?);
        return Ok(());
    }
    if usage.is_empty() {
        println!("No application usage recorded.");
        return Ok(());
    }
    for entry in usage {
        println!(
            "{:>8}  {}  ({})",
            format_minutes(entry.minutes),
            entry.label,
            entry.key
        );
    }
    Ok(())
}
