//! Status command showing each subject's last known state.

use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;

use dw_core::ActivityClass;
use dw_engine::{SubjectStatus, Tracker};

pub fn run<W: Write>(
    writer: &mut W,
    tracker: &Tracker,
    database_path: &Path,
    json: bool,
) -> Result<()> {
    let statuses = tracker.all_subject_statuses()?;

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&statuses)?)?;
        return Ok(());
    }

    writeln!(writer, "Deskwatch status")?;
    writeln!(writer, "Database: {}", database_path.display())?;

    let movement = tracker.movement_stats(Utc::now().date_naive())?;
    writeln!(
        writer,
        "Movement today: {} keys, {} clicks, {:.0} px",
        movement.keys_pressed, movement.clicks, movement.mouse_distance_px
    )?;

    if statuses.is_empty() {
        writeln!(writer, "No subjects registered.")?;
        return Ok(());
    }

    writeln!(writer, "Subjects:")?;
    for status in statuses {
        writeln!(writer, "{}", format_status_line(&status))?;
    }

    Ok(())
}

fn format_status_line(status: &SubjectStatus) -> String {
    let mut line = format!("- {}", status.subject);
    if let Some(name) = &status.name {
        line.push_str(&format!(" ({name})"));
    }
    match (status.state, status.last_activity) {
        (Some(state), Some(last_activity)) => {
            let state = match state {
                ActivityClass::Active => "active",
                ActivityClass::Idle => "idle",
            };
            line.push_str(&format!(
                ": {state}, last activity {}",
                last_activity.to_rfc3339()
            ));
            if let Some(app) = &status.current_app {
                line.push_str(&format!(", app {app}"));
            }
        }
        _ => line.push_str(": no events recorded"),
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};
    use dw_core::{EventKind, SubjectId};
    use dw_db::{Database, NewEvent};
    use insta::assert_snapshot;

    #[test]
    fn status_command_outputs_last_state_per_subject() {
        let temp = tempfile::tempdir().unwrap();
        let db_path = temp.path().join("dw.db");
        let mut db = Database::open(&db_path).unwrap();

        let dana = SubjectId::new("emp-001").unwrap();
        let lee = SubjectId::new("emp-002").unwrap();
        db.upsert_subject(&dana, Some("Dana"), None).unwrap();
        db.upsert_subject(&lee, None, None).unwrap();

        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut window_change = NewEvent::bare(dana.clone(), t0, EventKind::WindowChange);
        window_change.window_title = Some("Chrome".to_string());
        db.insert_event(&window_change).unwrap();

        let mut idle = NewEvent::bare(
            dana,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 2, 0).unwrap(),
            EventKind::Idle,
        );
        idle.window_title = Some("Chrome".to_string());
        db.insert_event(&idle).unwrap();

        let tracker = Tracker::new(db);
        let mut output = Vec::new();
        run(&mut output, &tracker, &db_path, false).unwrap();

        let output = String::from_utf8(output).unwrap();
        let output = output.replace(&db_path.display().to_string(), "[TEMP]/dw.db");
        assert_snapshot!(output, @r"
        Deskwatch status
        Database: [TEMP]/dw.db
        Movement today: 0 keys, 0 clicks, 0 px
        Subjects:
        - emp-001 (Dana): idle, last activity 2025-01-01T00:02:00+00:00, app Chrome
        - emp-002: no events recorded
        ");
    }
}
