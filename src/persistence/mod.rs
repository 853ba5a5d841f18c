//! Persistence layer for pipeline run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteRunStore;

pub use crate::core::ExecutionStatus;
use crate::core::{FailedAt, Pipeline, RunContext, StepState};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Summary of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run ID
    pub run_id: Uuid,

    /// Workflow name
    pub workflow_name: String,

    /// `push` or `pull_request`
    pub event: String,

    /// Pushed branch, or the pull request's base branch
    pub branch: String,

    /// Revision under test
    pub revision: String,

    /// Final status
    pub status: ExecutionStatus,

    /// First failing step, if the run failed
    pub failed_step: Option<FailedAt>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run completed (if complete)
    pub completed_at: Option<DateTime<Utc>>,

    /// Number of succeeded steps
    pub completed_steps: usize,

    /// Total number of steps
    pub total_steps: usize,

    /// Per-step outcome, in run order
    #[serde(default)]
    pub steps: Vec<StepSummary>,
}

impl RunSummary {
    /// `success`, `failed-at-step-N`, `skipped`...
    pub fn label(&self) -> String {
        match (&self.status, &self.failed_step) {
            (ExecutionStatus::Failed, Some(failed_at)) => failed_at.to_string(),
            (ExecutionStatus::Succeeded, _) => "success".to_string(),
            (status, _) => format!("{:?}", status).to_lowercase(),
        }
    }
}

/// Outcome of one step of a recorded run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSummary {
    pub id: String,
    pub name: String,
    pub outcome: String,
    pub detail: Option<String>,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a run, replacing any earlier record with the same ID
    async fn save_run(&self, run: &RunSummary) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>>;

    /// Most recent runs first, optionally for one workflow only
    async fn list_runs(&self, workflow_name: Option<&str>, limit: usize) -> Result<Vec<RunSummary>>;

    /// Names of all workflows with recorded runs, sorted
    async fn list_workflows(&self) -> Result<Vec<String>>;

    /// Number of recorded runs of a workflow
    async fn count_runs(&self, workflow_name: &str) -> Result<usize>;
}

/// In-memory persistence (for testing or ephemeral use)
pub struct InMemoryPersistence {
    runs: RwLock<HashMap<Uuid, RunSummary>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.insert(run.run_id, run.clone());
        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let runs = self.runs.read().await;
        Ok(runs.get(&run_id).cloned())
    }

    async fn list_runs(
        &self,
        workflow_name: Option<&str>,
        limit: usize,
    ) -> Result<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let mut result: Vec<RunSummary> = runs
            .values()
            .filter(|run| workflow_name.map_or(true, |name| run.workflow_name == name))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        result.truncate(limit);
        Ok(result)
    }

    async fn list_workflows(&self) -> Result<Vec<String>> {
        let runs = self.runs.read().await;
        let mut names: Vec<String> = runs.values().map(|run| run.workflow_name.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    async fn count_runs(&self, workflow_name: &str) -> Result<usize> {
        let runs = self.runs.read().await;
        Ok(runs
            .values()
            .filter(|run| run.workflow_name == workflow_name)
            .count())
    }
}

/// Create a summary from a pipeline and the context it ran in
pub fn create_summary(pipeline: &Pipeline, context: &RunContext) -> RunSummary {
    let steps = pipeline
        .steps
        .iter()
        .map(|step| {
            let (outcome, detail) = match &step.state {
                StepState::Pending => ("pending", None),
                StepState::Running { .. } => ("running", None),
                StepState::Succeeded { .. } => ("succeeded", None),
                StepState::Failed { error, .. } => ("failed", Some(error.clone())),
                StepState::Skipped { reason } => ("skipped", Some(reason.clone())),
            };
            StepSummary {
                id: step.id.clone(),
                name: step.name.clone(),
                outcome: outcome.to_string(),
                detail,
            }
        })
        .collect();

    RunSummary {
        run_id: pipeline.state.run_id,
        workflow_name: pipeline.name.clone(),
        event: context.event.name().to_string(),
        branch: context.event.branch().to_string(),
        revision: context.revision.clone(),
        status: pipeline.state.status,
        failed_step: pipeline.state.failed_at.clone(),
        started_at: pipeline.state.started_at.unwrap_or_else(Utc::now),
        completed_at: pipeline.state.completed_at,
        completed_steps: pipeline.state.completed_steps,
        total_steps: pipeline.steps.len(),
        steps,
    }
}
