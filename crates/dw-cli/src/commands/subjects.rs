//! Subject management commands.

use anyhow::Result;

use dw_core::SubjectId;
use dw_engine::Tracker;

pub fn add(tracker: &Tracker, id: &str, name: Option<&str>, team: Option<&str>) -> Result<()> {
    let subject = SubjectId::new(id)?;
    tracker.ensure_subject(&subject, name, team)?;
    println!("Subject registered: {subject}");
    Ok(())
}

pub fn list(tracker: &Tracker, json: bool) -> Result<()> {
    let subjects = tracker.subjects()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&subjects)?);
        return Ok(());
    }
    if subjects.is_empty() {
        println!("No subjects registered.");
        return Ok(());
    }
    for record in subjects {
        let mut line = format!("- {}", record.id);
        if let Some(name) = &record.name {
            line.push_str(&format!(" ({name})"));
        }
        if let Some(team) = &record.team {
            line.push_str(&format!(" [{team}]"));
        }
        println!("{line}");
    }
    Ok(())
}

pub fn remove(tracker: &Tracker, id: &str) -> Result<()> {
    let subject = SubjectId::new(id)?;
    tracker.remove_subject(&subject)?;
    println!("Subject removed: {subject}");
    Ok(())
}
