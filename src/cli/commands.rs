//! CLI command definitions

use crate::core::TriggerEvent;
use clap::Args;
use std::path::PathBuf;

/// Run a workflow against a revision
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to workflow YAML file (defaults to the built-in Rust workflow)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Event that triggers the run
    #[arg(long, value_enum, default_value_t = EventArg::Push)]
    pub event: EventArg,

    /// Pushed branch, or the pull request's base branch
    /// (defaults to the repository's current branch for push, `main` for pull-request)
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Repository to check out
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Revision to test
    #[arg(long, default_value = "HEAD")]
    pub rev: String,

    /// Run in this (empty) directory instead of a temporary one
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Don't remove the temporary workspace after the run
    #[arg(long)]
    pub keep_workspace: bool,

    /// Environment overrides (key=value)
    #[arg(long = "env", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,
}

impl RunCommand {
    /// Branch used when none is given for a pull request
    pub const DEFAULT_BASE: &'static str = "main";
}

/// Validate a workflow configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to workflow YAML file (defaults to the built-in Rust workflow)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// List workflows with recorded runs
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Show run counts
    #[arg(long)]
    pub with_counts: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Workflow name to filter by
    #[arg(short, long)]
    pub workflow: Option<String>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show per-step outcomes
    #[arg(long)]
    pub verbose: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Show a single run
    #[arg(long)]
    pub run_id: Option<String>,
}

/// Triggering event argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventArg {
    Push,
    #[clap(name = "pull-request")]
    PullRequest,
}

impl EventArg {
    pub fn to_event(self, branch: String) -> TriggerEvent {
        match self {
            EventArg::Push => TriggerEvent::Push { branch },
            EventArg::PullRequest => TriggerEvent::PullRequest { base: branch },
        }
    }
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid key=value pair: {}", s)),
    }
}
