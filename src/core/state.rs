//! Execution state models

use crate::core::step::StepCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Pipeline has not started
    Pending,
    /// Pipeline is currently running
    Running,
    /// Every step succeeded
    Succeeded,
    /// A step failed and the run stopped there
    Failed,
    /// The event did not match the workflow triggers
    Skipped,
    /// Interrupted before reaching a verdict
    Cancelled,
}

/// State of a single step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StepState {
    /// Step has not run yet
    Pending,
    /// Step is currently running
    Running { started_at: DateTime<Utc> },
    /// Step exited zero
    Succeeded {
        log: String,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Step failed; the run stops here
    Failed {
        error: String,
        exit_code: Option<i32>,
        log: String,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Step never ran
    Skipped { reason: String },
}

impl StepState {
    /// Check if step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepState::Succeeded { .. } | StepState::Failed { .. } | StepState::Skipped { .. }
        )
    }

    /// Whether the step actually executed
    pub fn was_executed(&self) -> bool {
        matches!(
            self,
            StepState::Running { .. } | StepState::Succeeded { .. } | StepState::Failed { .. }
        )
    }

    /// Captured output, if the step ran to completion
    pub fn log(&self) -> Option<&str> {
        match self {
            StepState::Succeeded { log, .. } | StepState::Failed { log, .. } => Some(log),
            _ => None,
        }
    }
}

/// Where a failed run stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAt {
    /// 1-based step position
    pub index: usize,
    pub step_id: String,
    pub category: StepCategory,
}

impl fmt::Display for FailedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed-at-step-{}", self.index)
    }
}

/// Overall pipeline state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of steps
    pub total_steps: usize,

    /// Number of succeeded steps
    pub completed_steps: usize,

    /// Set when the run failed
    pub failed_at: Option<FailedAt>,
}

impl PipelineState {
    /// Create a new pipeline state
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
            failed_at: None,
        }
    }

    /// Mark pipeline as started
    pub fn start(&mut self, total_steps: usize) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_steps = total_steps;
    }

    /// Mark pipeline as succeeded
    pub fn succeed(&mut self) {
        self.status = ExecutionStatus::Succeeded;
        self.completed_at = Some(Utc::now());
    }

    /// Mark pipeline as failed at the given step
    pub fn fail(&mut self, failed_at: FailedAt) {
        self.status = ExecutionStatus::Failed;
        self.failed_at = Some(failed_at);
        self.completed_at = Some(Utc::now());
    }

    /// Mark pipeline as not triggered
    pub fn skip(&mut self) {
        self.status = ExecutionStatus::Skipped;
        self.completed_at = Some(Utc::now());
    }

    /// Mark pipeline as cancelled
    pub fn cancel(&mut self) {
        self.status = ExecutionStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }

    /// Short status label: `pending`, `running`, `success`, `failed-at-step-N`, ...
    pub fn label(&self) -> String {
        match (&self.status, &self.failed_at) {
            (ExecutionStatus::Failed, Some(failed_at)) => failed_at.to_string(),
            (ExecutionStatus::Failed, None) => "failed".to_string(),
            (ExecutionStatus::Pending, _) => "pending".to_string(),
            (ExecutionStatus::Running, _) => "running".to_string(),
            (ExecutionStatus::Succeeded, _) => "success".to_string(),
            (ExecutionStatus::Skipped, _) => "skipped".to_string(),
            (ExecutionStatus::Cancelled, _) => "cancelled".to_string(),
        }
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}
