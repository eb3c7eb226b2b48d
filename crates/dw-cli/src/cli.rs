//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Workforce activity tracker.
///
/// Reconstructs continuous active/idle timelines and per-application usage
/// from sparse transition events recorded by per-subject monitoring agents.
#[derive(Debug, Parser)]
#[command(name = "dw", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Initialize the database.
    Init,

    /// Manage monitored subjects.
    Subjects {
        #[command(subcommand)]
        action: SubjectsAction,
    },

    /// Record one transition event for a subject.
    Record {
        /// The subject the event belongs to.
        #[arg(long)]
        subject: String,

        /// Event kind (active, idle, window_change, non_work_detected,
        /// idle_photo).
        #[arg(long)]
        kind: String,

        /// Active window title, if known.
        #[arg(long)]
        title: Option<String>,

        /// Owning process name, if known.
        #[arg(long)]
        process: Option<String>,

        /// Path to an associated screenshot or photo.
        #[arg(long)]
        artifact: Option<String>,

        /// Free-form note.
        #[arg(long)]
        note: Option<String>,
    },

    /// Record one movement sample and flush the batch.
    Movement {
        /// The subject the sample belongs to.
        #[arg(long)]
        subject: String,

        /// Sample kind (key_press, mouse_move, mouse_click).
        #[arg(long)]
        kind: String,

        /// Key name, button, or cursor position.
        #[arg(long, default_value = "")]
        detail: String,

        /// Pointer travel in pixels.
        #[arg(long, default_value_t = 0.0)]
        distance: f64,
    },

    /// Show active/idle minutes and sessions for a subject.
    Timeline {
        /// The subject to query.
        #[arg(long)]
        subject: String,

        /// Day to query (defaults to today, UTC).
        #[arg(long, conflicts_with_all = ["start", "end"])]
        day: Option<NaiveDate>,

        /// Window start (ISO 8601 or e.g. "2 hours ago"); requires --end.
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Window end (ISO 8601 or relative); requires --start.
        #[arg(long, requires = "start")]
        end: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show per-application usage for a subject.
    Apps {
        /// The subject to query.
        #[arg(long)]
        subject: String,

        /// Day to query (defaults to today, UTC).
        #[arg(long)]
        day: Option<NaiveDate>,

        /// Show only the top N applications.
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show company-wide application usage merged across subjects.
    Company {
        /// Day to query (defaults to today, UTC).
        #[arg(long)]
        day: Option<NaiveDate>,

        /// Show only the top N applications.
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show each subject's last known state.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rank subjects by active minutes over a day range.
    Rank {
        /// First day of the range (defaults to six days ago, UTC).
        #[arg(long)]
        start_day: Option<NaiveDate>,

        /// Last day of the range, inclusive (defaults to today, UTC).
        #[arg(long)]
        end_day: Option<NaiveDate>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete one subject's events and movement samples for a day.
    Clear {
        /// The subject to clear.
        #[arg(long)]
        subject: String,

        /// Day to clear (defaults to today, UTC).
        #[arg(long)]
        day: Option<NaiveDate>,
    },

    /// Run the monitoring agent for a subject until interrupted.
    Monitor {
        /// The subject to monitor.
        #[arg(long)]
        subject: String,
    },
}

/// Subject management actions.
#[derive(Debug, Subcommand)]
pub enum SubjectsAction {
    /// Register a subject or update its details.
    Add {
        /// Subject identifier.
        id: String,

        /// Human-readable name.
        #[arg(long)]
        name: Option<String>,

        /// Team name.
        #[arg(long)]
        team: Option<String>,
    },

    /// List registered subjects.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Delete a subject and everything recorded for it.
    Remove {
        /// Subject identifier.
        id: String,
    },
}
