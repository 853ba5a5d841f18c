//! Pipeline domain model

use crate::core::{
    config::WorkflowConfig,
    state::{ExecutionStatus, PipelineState, StepState},
    step::{Step, StepDefaults},
    trigger::{TriggerEvent, Triggers},
};
use anyhow::Result;
use std::collections::BTreeMap;

/// A pipeline ready to run: ordered steps plus run state
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Events that start a run
    pub triggers: Triggers,

    /// Environment shared by all steps
    pub env: BTreeMap<String, String>,

    /// Steps in execution order
    pub steps: Vec<Step>,

    /// Execution state
    pub state: PipelineState,
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        let defaults = StepDefaults {
            timeout_secs: config
                .default_timeout_secs
                .unwrap_or(StepDefaults::default().timeout_secs),
        };

        let steps = config
            .steps
            .iter()
            .enumerate()
            .map(|(position, step_config)| Step::from_config(step_config, position, &defaults))
            .collect::<Result<Vec<_>>>()?;

        Ok(Pipeline {
            name: config.name.clone(),
            triggers: Triggers::from_config(config.triggers.as_ref())?,
            env: config.env_vars(),
            steps,
            state: PipelineState::new(),
        })
    }

    /// Get a step by ID
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Whether `event` starts a run of this pipeline
    pub fn is_triggered_by(&self, event: &TriggerEvent) -> bool {
        self.triggers.matches(event)
    }

    /// Position of the first step that has not run yet
    pub fn next_pending(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|s| matches!(s.state, StepState::Pending))
    }

    /// Check if every step reached a terminal state
    pub fn is_complete(&self) -> bool {
        self.steps.iter().all(|s| s.state.is_terminal())
    }

    /// Check if pipeline succeeded
    pub fn has_succeeded(&self) -> bool {
        self.state.status == ExecutionStatus::Succeeded
    }

    /// Ids of the steps that actually executed, in order
    pub fn executed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.state.was_executed())
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Forget all run state so the pipeline can run again under a new run id
    pub fn reset(&mut self) {
        for step in &mut self.steps {
            step.state = StepState::Pending;
        }
        self.state = PipelineState::new();
    }
}
