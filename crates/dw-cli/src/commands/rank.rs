//! Rank command ordering subjects by active minutes.

use anyhow::Result;
use chrono::{Days, NaiveDate};

use dw_engine::{Tracker, day_bounds};

use super::util::{day_or_today, format_minutes};

/// Runs the rank command over an inclusive day range.
pub fn run(
    tracker: &Tracker,
    start_day: Option<NaiveDate>,
    end_day: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let end_day = day_or_today(end_day);
    let start_day = start_day.unwrap_or_else(|| end_day - Days::new(6));
    anyhow::ensure!(start_day <= end_day, "start day must not be after end day");

    let (start, _) = day_bounds(start_day);
    let (_, end) = day_bounds(end_day);
    let ranked = tracker.rank_subjects(start, end)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ranked)?);
        return Ok(());
    }
    if ranked.is_empty() {
        println!("No subjects registered.");
        return Ok(());
    }
    for (position, entry) in ranked.iter().enumerate() {
        println!(
            "{}. {}  {}",
            position + 1,
            entry.subject,
            format_minutes(entry.active_minutes)
        );
    }
    Ok(())
}
