use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dw_cli::commands::{
    apps, clear, company, init, monitor, movement, rank, record, status, subjects, timeline,
};
use dw_cli::{Cli, Commands, Config, SubjectsAction};
use dw_engine::Tracker;

/// Load config and open the database, ensuring the parent directory exists.
fn open_tracker(config_path: Option<&Path>) -> Result<(Tracker, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = dw_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((Tracker::new(db), config))
}

#[expect(
    clippy::too_many_lines,
    reason = "CLI command dispatch is inherently verbose"
)]
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Init) => {
            let config =
                Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
            init::run(&config)?;
        }
        Some(Commands::Subjects { action }) => {
            let (tracker, _config) = open_tracker(cli.config.as_deref())?;
            match action {
                SubjectsAction::Add { id, name, team } => {
                    subjects::add(&tracker, id, name.as_deref(), team.as_deref())?;
                }
                SubjectsAction::List { json } => subjects::list(&tracker, *json)?,
                SubjectsAction::Remove { id } => subjects::remove(&tracker, id)?,
            }
        }
        Some(Commands::Record {
            subject,
            kind,
            title,
            process,
            artifact,
            note,
        }) => {
            let (tracker, _config) = open_tracker(cli.config.as_deref())?;
            record::run(
                &tracker,
                record::RecordArgs {
                    subject,
                    kind,
                    title: title.clone(),
                    process: process.clone(),
                    artifact: artifact.clone(),
                    note: note.clone(),
                },
            )?;
        }
        Some(Commands::Movement {
            subject,
            kind,
            detail,
            distance,
        }) => {
            let (tracker, config) = open_tracker(cli.config.as_deref())?;
            movement::run(&tracker, &config, subject, kind, detail, *distance)?;
        }
        Some(Commands::Timeline {
            subject,
            day,
            start,
            end,
            json,
        }) => {
            let (tracker, _config) = open_tracker(cli.config.as_deref())?;
            timeline::run(
                &tracker,
                subject,
                *day,
                start.as_deref(),
                end.as_deref(),
                *json,
            )?;
        }
        Some(Commands::Apps {
            subject,
            day,
            limit,
            json,
        }) => {
            let (tracker, _config) = open_tracker(cli.config.as_deref())?;
            apps::run(&tracker, subject, *day, *limit, *json)?;
        }
        Some(Commands::Company { day, limit, json }) => {
            let (tracker, _config) = open_tracker(cli.config.as_deref())?;
            company::run(&tracker, *day, *limit, *json)?;
        }
        Some(Commands::Status { json }) => {
            let (tracker, config) = open_tracker(cli.config.as_deref())?;
            let mut stdout = std::io::stdout().lock();
            status::run(&mut stdout, &tracker, &config.database_path, *json)?;
        }
        Some(Commands::Rank {
            start_day,
            end_day,
            json,
        }) => {
            let (tracker, _config) = open_tracker(cli.config.as_deref())?;
            rank::run(&tracker, *start_day, *end_day, *json)?;
        }
        Some(Commands::Clear { subject, day }) => {
            let (tracker, _config) = open_tracker(cli.config.as_deref())?;
            clear::run(&tracker, subject, *day)?;
        }
        Some(Commands::Monitor { subject }) => {
            let (tracker, config) = open_tracker(cli.config.as_deref())?;
            monitor::run(&tracker, &config, subject)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
