//! Deskwatch CLI library.
//!
//! This crate provides the `dw` command-line interface over the activity
//! engine.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, SubjectsAction};
pub use config::Config;
