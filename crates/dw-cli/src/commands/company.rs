//! Company command showing application usage merged across all subjects.

use anyhow::Result;
use chrono::NaiveDate;

use dw_engine::Tracker;

use super::apps::print_usage;
use super::util::day_or_today;

/// Runs the company command.
pub fn run(tracker: &Tracker, day: Option<NaiveDate>, limit: Option<usize>, json: bool) -> Result<()> {
    let usage = tracker.get_company_app_usage(day_or_today(day))?;
    print_usage(&usage, limit, json)
}
