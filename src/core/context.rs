//! Run context - where and for what a pipeline run executes

use crate::core::{step::Step, trigger::TriggerEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Execution context for a pipeline run
///
/// Holds the isolated workspace, the revision under test, the triggering
/// event and the environment every step inherits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    /// Directory the run checks out into and executes in
    pub workspace: PathBuf,

    /// Repository the checkout step clones from
    pub repository: Option<String>,

    /// Commit, tag or branch under test
    pub revision: String,

    /// Event that started the run
    pub event: TriggerEvent,

    /// Workflow-level environment
    pub env: BTreeMap<String, String>,
}

impl RunContext {
    /// Create a context for a run of `revision` triggered by `event`
    pub fn new(
        workspace: impl Into<PathBuf>,
        event: TriggerEvent,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            repository: None,
            revision: revision.into(),
            event,
            env: BTreeMap::new(),
        }
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Set a variable
    pub fn set_env(&mut self, key: String, value: String) {
        self.env.insert(key, value);
    }

    /// Variables describing the run itself
    pub fn builtin_env(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("CI".to_string(), "true".to_string());
        vars.insert(
            "CI_WORKSPACE".to_string(),
            self.workspace.display().to_string(),
        );
        vars.insert("CI_EVENT_NAME".to_string(), self.event.name().to_string());
        vars.insert("CI_REF".to_string(), self.event.branch().to_string());
        vars.insert("CI_SHA".to_string(), self.revision.clone());
        vars
    }

    /// Environment for one step: built-ins, then workflow env, then step env
    pub fn step_env(&self, step: &Step) -> BTreeMap<String, String> {
        let mut vars = self.builtin_env();
        vars.extend(self.env.clone());
        vars.extend(step.env.clone());
        vars
    }

    /// Directory a step runs in
    pub fn step_dir(&self, step: &Step) -> PathBuf {
        match &step.working_directory {
            Some(dir) => self.workspace.join(dir),
            None => self.workspace.clone(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }
}
