//! Command-line interface

pub mod commands;
pub mod exit;
pub mod output;
pub mod terminal_output;

use clap::{Parser, Subcommand};
use commands::{HistoryCommand, ListCommand, RunCommand, ValidateCommand};
use std::ffi::OsString;

/// Local CI pipeline runner
#[derive(Debug, Parser, Clone)]
#[command(name = "ci-pipeline")]
#[command(version)]
#[command(about = "Run fail-fast CI workflows against a local repository", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Don't echo step output; show a spinner per step instead
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run a workflow
    Run(RunCommand),

    /// Validate a workflow configuration
    Validate(ValidateCommand),

    /// List workflows in run history
    List(ListCommand),

    /// Show run history
    History(HistoryCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
