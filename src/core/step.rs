//! Step domain model

use crate::core::{config::StepConfig, state::StepState};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What kind of work a step does; decides how its failure is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCategory {
    Checkout,
    ToolchainInstall,
    CompilerInstall,
    FormatCheck,
    Build,
    Test,
    Command,
}

impl StepCategory {
    /// Derive the category of a `run:` command from its leading cargo/rustfmt invocation
    pub fn from_command(command: &str) -> Self {
        let first = command
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#'))
            .unwrap_or("");
        let mut words = first.split_whitespace();

        match words.next() {
            Some("rustfmt") => StepCategory::FormatCheck,
            Some("cargo") => {
                let subcommand = words.find(|w| !w.starts_with('+') && !w.starts_with('-'));
                match subcommand {
                    Some("fmt") => StepCategory::FormatCheck,
                    Some("build") | Some("check") => StepCategory::Build,
                    Some("test") | Some("nextest") => StepCategory::Test,
                    _ => StepCategory::Command,
                }
            }
            _ => StepCategory::Command,
        }
    }

    /// Human-readable failure label
    pub fn failure_label(&self) -> &'static str {
        match self {
            StepCategory::Checkout => "checkout failure",
            StepCategory::ToolchainInstall => "toolchain install failure",
            StepCategory::CompilerInstall => "protobuf compiler install failure",
            StepCategory::FormatCheck => "formatting violation",
            StepCategory::Build => "compilation failure",
            StepCategory::Test => "test failure",
            StepCategory::Command => "command failure",
        }
    }
}

impl fmt::Display for StepCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepCategory::Checkout => "checkout",
            StepCategory::ToolchainInstall => "toolchain-install",
            StepCategory::CompilerInstall => "compiler-install",
            StepCategory::FormatCheck => "format-check",
            StepCategory::Build => "build",
            StepCategory::Test => "test",
            StepCategory::Command => "command",
        };
        f.write_str(name)
    }
}

/// Built-in actions a workflow may `use`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// `actions/checkout`
    Checkout,
    /// `dtolnay/rust-toolchain`, `actions-rs/toolchain`
    RustToolchain,
    /// `arduino/setup-protoc`
    SetupProtoc,
}

impl ActionKind {
    pub fn category(&self) -> StepCategory {
        match self {
            ActionKind::Checkout => StepCategory::Checkout,
            ActionKind::RustToolchain => StepCategory::ToolchainInstall,
            ActionKind::SetupProtoc => StepCategory::CompilerInstall,
        }
    }
}

/// A parsed `owner/name@ref` action reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRef {
    pub name: String,
    pub git_ref: Option<String>,
    pub kind: ActionKind,
}

impl ActionRef {
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        let (name, git_ref) = match reference.split_once('@') {
            Some((name, git_ref)) if !git_ref.is_empty() => (name, Some(git_ref.to_string())),
            Some((name, _)) => (name, None),
            None => (reference, None),
        };

        let kind = match name {
            "actions/checkout" => ActionKind::Checkout,
            "dtolnay/rust-toolchain" | "actions-rs/toolchain" => ActionKind::RustToolchain,
            "arduino/setup-protoc" => ActionKind::SetupProtoc,
            other => anyhow::bail!("Unsupported action '{}'", other),
        };

        Ok(Self {
            name: name.to_string(),
            git_ref,
            kind,
        })
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.git_ref {
            Some(git_ref) => write!(f, "{}@{}", self.name, git_ref),
            None => f.write_str(&self.name),
        }
    }
}

/// What a step executes
#[derive(Debug, Clone)]
pub enum StepAction {
    /// A built-in action with its inputs
    Uses {
        action: ActionRef,
        with: BTreeMap<String, String>,
    },
    /// A shell script
    Run { command: String },
}

/// A single step in a pipeline
#[derive(Debug, Clone)]
pub struct Step {
    /// Unique step identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// 1-based position in the pipeline
    pub index: usize,

    pub action: StepAction,

    pub category: StepCategory,

    /// Step-level environment
    pub env: BTreeMap<String, String>,

    /// Directory relative to the workspace
    pub working_directory: Option<String>,

    /// Timeout in seconds
    pub timeout_secs: u64,

    /// Runtime state
    pub state: StepState,
}

impl Step {
    /// Create a step from a step config at 0-based `position`
    pub fn from_config(
        config: &StepConfig,
        position: usize,
        defaults: &StepDefaults,
    ) -> Result<Self> {
        let action = match (&config.uses, &config.run) {
            (Some(uses), _) => StepAction::Uses {
                action: ActionRef::parse(uses)?,
                with: config.with_inputs(),
            },
            (None, Some(run)) => StepAction::Run {
                command: run.clone(),
            },
            (None, None) => anyhow::bail!(
                "Step '{}' must specify 'uses' or 'run'",
                config.step_id(position)
            ),
        };

        let category = config.category.unwrap_or(match &action {
            StepAction::Uses { action, .. } => action.kind.category(),
            StepAction::Run { command } => StepCategory::from_command(command),
        });

        Ok(Step {
            id: config.step_id(position),
            name: config.display_name(),
            index: position + 1,
            action,
            category,
            env: config.env_vars(),
            working_directory: config.working_directory.clone(),
            timeout_secs: config.timeout_secs.unwrap_or(defaults.timeout_secs),
            state: StepState::Pending,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StepDefaults {
    pub timeout_secs: u64,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: 3600, // 1 hour
        }
    }
}
