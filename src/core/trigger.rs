//! Trigger rules - decide whether an incoming event starts a run

use crate::core::config::{EventFilterConfig, TriggersConfig};
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An event that may start a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TriggerEvent {
    /// Commits pushed to `branch`
    Push { branch: String },
    /// Pull request whose target branch is `base`
    PullRequest { base: String },
}

impl TriggerEvent {
    /// Event name as used in workflow `on:` keys
    pub fn name(&self) -> &'static str {
        match self {
            TriggerEvent::Push { .. } => "push",
            TriggerEvent::PullRequest { .. } => "pull_request",
        }
    }

    /// Branch the event is matched against
    pub fn branch(&self) -> &str {
        match self {
            TriggerEvent::Push { branch } => branch,
            TriggerEvent::PullRequest { base } => base,
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerEvent::Push { branch } => write!(f, "push to {}", branch),
            TriggerEvent::PullRequest { base } => write!(f, "pull request into {}", base),
        }
    }
}

/// A compiled branch glob (`*` stays inside one path segment, `**` crosses segments)
#[derive(Debug, Clone)]
pub struct BranchPattern {
    regex: Regex,
}

impl BranchPattern {
    pub fn new(raw: &str) -> Result<Self> {
        let mut expr = String::from("^");
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' if chars.peek() == Some(&'*') => {
                    chars.next();
                    expr.push_str(".*");
                }
                '*' => expr.push_str("[^/]*"),
                '?' => expr.push_str("[^/]"),
                other => expr.push_str(&regex::escape(&other.to_string())),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr)
            .with_context(|| format!("Invalid branch pattern '{}'", raw))?;
        Ok(Self { regex })
    }

    pub fn matches(&self, branch: &str) -> bool {
        self.regex.is_match(branch)
    }
}

/// Branch filter for one event kind
#[derive(Debug, Clone, Default)]
pub struct BranchFilter {
    /// Empty means every branch is included
    include: Vec<BranchPattern>,
    exclude: Vec<BranchPattern>,
}

impl BranchFilter {
    /// Filter that accepts every branch
    pub fn any() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EventFilterConfig) -> Result<Self> {
        let include = config
            .branches
            .iter()
            .map(|p| BranchPattern::new(p))
            .collect::<Result<Vec<_>>>()?;
        let exclude = config
            .branches_ignore
            .iter()
            .map(|p| BranchPattern::new(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { include, exclude })
    }

    pub fn matches(&self, branch: &str) -> bool {
        let included = self.include.is_empty() || self.include.iter().any(|p| p.matches(branch));
        included && !self.exclude.iter().any(|p| p.matches(branch))
    }
}

/// The set of events a workflow reacts to
#[derive(Debug, Clone, Default)]
pub struct Triggers {
    pub push: Option<BranchFilter>,
    pub pull_request: Option<BranchFilter>,
}

impl Triggers {
    /// Triggers that accept every supported event
    pub fn any() -> Self {
        Self {
            push: Some(BranchFilter::any()),
            pull_request: Some(BranchFilter::any()),
        }
    }

    /// Compile the `on:` section of a workflow
    pub fn from_config(config: Option<&TriggersConfig>) -> Result<Self> {
        let config = match config {
            Some(config) => config,
            None => return Ok(Self::any()),
        };

        let mut triggers = Triggers::default();
        for (event, filter) in config.events() {
            let filter = match filter {
                Some(filter) => BranchFilter::from_config(filter)?,
                None => BranchFilter::any(),
            };
            match event {
                "push" => triggers.push = Some(filter),
                "pull_request" => triggers.pull_request = Some(filter),
                other => anyhow::bail!(
                    "Unsupported trigger event '{}' (expected 'push' or 'pull_request')",
                    other
                ),
            }
        }

        Ok(triggers)
    }

    /// Whether `event` starts a run
    pub fn matches(&self, event: &TriggerEvent) -> bool {
        let filter = match event {
            TriggerEvent::Push { .. } => self.push.as_ref(),
            TriggerEvent::PullRequest { .. } => self.pull_request.as_ref(),
        };
        filter.is_some_and(|f| f.matches(event.branch()))
    }
}
