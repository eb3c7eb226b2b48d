//! Clear command deleting one subject's recorded day.

use anyhow::Result;
use chrono::NaiveDate;

use dw_core::SubjectId;
use dw_engine::Tracker;

use super::util::day_or_today;

pub fn run(tracker: &Tracker, subject: &str, day: Option<NaiveDate>) -> Result<()> {
    let subject = SubjectId::new(subject)?;
    let day = day_or_today(day);
    tracker.clear_day(&subject, day)?;
    println!("Cleared {day} for {subject}");
    Ok(())
}
