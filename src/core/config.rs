//! Workflow configuration from YAML

use crate::core::{
    step::{ActionRef, StepCategory},
    trigger::Triggers,
    Pipeline,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Top-level workflow configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Workflow name
    pub name: String,

    /// Events that trigger the workflow (absent = every event)
    #[serde(rename = "on", default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<TriggersConfig>,

    /// Environment shared by every step
    #[serde(default)]
    env: BTreeMap<String, Value>,

    /// Steps, executed strictly in order
    pub steps: Vec<StepConfig>,

    /// Default timeout for steps (in seconds)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,
}

/// The `on:` section, in any of its accepted shapes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriggersConfig {
    /// `on: push`
    Event(String),
    /// `on: [push, pull_request]`
    Events(Vec<String>),
    /// `on: { push: { branches: [main] } }`
    Detailed(BTreeMap<String, Option<EventFilterConfig>>),
}

impl TriggersConfig {
    /// Flatten to (event name, optional branch filter) pairs
    pub fn events(&self) -> Vec<(&str, Option<&EventFilterConfig>)> {
        match self {
            TriggersConfig::Event(name) => vec![(name.as_str(), None)],
            TriggersConfig::Events(names) => names.iter().map(|n| (n.as_str(), None)).collect(),
            TriggersConfig::Detailed(map) => map
                .iter()
                .map(|(name, filter)| (name.as_str(), filter.as_ref()))
                .collect(),
        }
    }
}

/// Branch filter for one event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilterConfig {
    #[serde(default)]
    pub branches: Vec<String>,

    #[serde(default, rename = "branches-ignore")]
    pub branches_ignore: Vec<String>,
}

impl EventFilterConfig {
    pub fn branches(branches: &[&str]) -> Self {
        Self {
            branches: branches.iter().map(|b| b.to_string()).collect(),
            branches_ignore: Vec::new(),
        }
    }
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepConfig {
    /// Step identifier (defaults to `step-N`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable step name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Reusable action reference, e.g. `actions/checkout@v4`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<String>,

    /// Shell command
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,

    /// Action inputs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    with: BTreeMap<String, Value>,

    /// Step-level environment (overrides workflow env)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, Value>,

    /// Directory to run in, relative to the workspace
    #[serde(default, rename = "working-directory", skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    /// Timeout for this step (overrides global)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Explicit failure category (derived from the step when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<StepCategory>,
}

impl StepConfig {
    /// A step that uses a reusable action
    pub fn uses(action: &str) -> Self {
        Self {
            uses: Some(action.to_string()),
            ..Self::default()
        }
    }

    /// A named step that runs a shell command
    pub fn run(name: &str, command: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            run: Some(command.to_string()),
            ..Self::default()
        }
    }

    /// Effective step id for the step at `index` (0-based)
    pub fn step_id(&self, index: usize) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("step-{}", index + 1))
    }

    /// Effective display name
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.uses.clone())
            .or_else(|| self.run.as_ref().map(|r| first_line(r).to_string()))
            .unwrap_or_default()
    }

    pub fn with_inputs(&self) -> BTreeMap<String, String> {
        scalar_map(&self.with)
    }

    pub fn env_vars(&self) -> BTreeMap<String, String> {
        scalar_map(&self.env)
    }
}

impl WorkflowConfig {
    /// Load workflow configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse workflow configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: WorkflowConfig =
            serde_yaml::from_str(yaml).context("Failed to parse workflow YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// The checkout / toolchain / protoc / fmt / build / test workflow for a
    /// Rust project that compiles `.proto` schemas
    pub fn default_rust_protobuf() -> Self {
        let mut triggers = BTreeMap::new();
        triggers.insert("push".to_string(), Some(EventFilterConfig::branches(&["main"])));
        triggers.insert(
            "pull_request".to_string(),
            Some(EventFilterConfig::branches(&["main"])),
        );

        let mut env = BTreeMap::new();
        env.insert(
            "CARGO_TERM_COLOR".to_string(),
            Value::String("always".to_string()),
        );

        WorkflowConfig {
            name: "Rust".to_string(),
            triggers: Some(TriggersConfig::Detailed(triggers)),
            env,
            steps: vec![
                StepConfig::uses("actions/checkout@v4"),
                StepConfig::uses("dtolnay/rust-toolchain@stable"),
                StepConfig::uses("arduino/setup-protoc@v3"),
                StepConfig::run("Check formatting", "cargo fmt --check"),
                StepConfig::run("Build", "cargo build --verbose"),
                StepConfig::run("Run tests", "cargo test --verbose --all-features"),
            ],
            default_timeout_secs: None,
        }
    }

    /// Validate the workflow configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Workflow name must not be empty");
        }

        if self.steps.is_empty() {
            anyhow::bail!("Workflow '{}' has no steps", self.name);
        }

        if self.default_timeout_secs == Some(0) {
            anyhow::bail!("Workflow default timeout must be greater than zero");
        }

        let mut seen_ids = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            let id = step.step_id(index);
            if !seen_ids.insert(id.clone()) {
                anyhow::bail!("Duplicate step ID: {}", id);
            }

            match (&step.uses, &step.run) {
                (Some(_), Some(_)) => anyhow::bail!(
                    "Step '{}' must specify either 'uses' or 'run', not both",
                    id
                ),
                (None, None) => anyhow::bail!("Step '{}' must specify 'uses' or 'run'", id),
                (Some(uses), None) => {
                    ActionRef::parse(uses).with_context(|| format!("Step '{}'", id))?;
                }
                (None, Some(run)) => {
                    if run.trim().is_empty() {
                        anyhow::bail!("Step '{}' has an empty 'run' command", id);
                    }
                }
            }

            if step.timeout_secs == Some(0) {
                anyhow::bail!("Step '{}' timeout must be greater than zero", id);
            }
        }

        Triggers::from_config(self.triggers.as_ref())?;

        Ok(())
    }

    /// Workflow-level environment as strings
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        scalar_map(&self.env)
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Result<Pipeline> {
        Pipeline::from_config(self)
    }
}

/// Render YAML scalars as strings; `true`, `1` and `"x"` all become env-style values
fn scalar_map(values: &BTreeMap<String, Value>) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null => String::new(),
                other => serde_yaml::to_string(other)
                    .unwrap_or_default()
                    .trim_end()
                    .to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("").trim()
}
