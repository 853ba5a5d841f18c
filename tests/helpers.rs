//! Test utility functions for ci-pipeline
#![allow(dead_code)]

use ci_pipeline::core::config::WorkflowConfig;
use ci_pipeline::core::{ExecutionStatus, Pipeline, RunContext, StepState, TriggerEvent};
use ci_pipeline::execution::{ExecutionEngine, ExecutionEvent, StepFailure};
use ci_pipeline::runner::{
    CommandOutput, CommandRunner, CommandSpec, OutputCallback, OutputStream, RunnerError,
};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A command the scripted runner was asked to run
#[derive(Debug, Clone)]
pub struct RecordedCommand {
    pub display: String,
    pub env: BTreeMap<String, String>,
    pub cwd: std::path::PathBuf,
}

/// Mock runner that succeeds unless a command matches a scripted failure
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    failures: Arc<Mutex<Vec<(String, Result<i32, RunnerError>)>>>,
    commands: Arc<Mutex<Vec<RecordedCommand>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands containing `pattern` exit with `code`
    pub fn fail_on(self, pattern: &str, code: i32) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((pattern.to_string(), Ok(code)));
        self
    }

    /// Commands containing `pattern` fail with a runner error
    pub fn error_on(self, pattern: &str, error: RunnerError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .push((pattern.to_string(), Err(error)));
        self
    }

    /// Everything run so far, in order
    pub fn commands(&self) -> Vec<RecordedCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.commands().into_iter().map(|c| c.display).collect()
    }

    pub fn ran(&self, pattern: &str) -> bool {
        self.command_lines().iter().any(|c| c.contains(pattern))
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<CommandOutput, RunnerError> {
        let display = spec.display();
        self.commands.lock().unwrap().push(RecordedCommand {
            display: display.clone(),
            env: spec.env.clone(),
            cwd: spec.cwd.clone(),
        });

        let scripted = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| display.contains(pattern.as_str()))
            .map(|(_, outcome)| outcome.clone());

        let code = match scripted {
            Some(Err(error)) => return Err(error),
            Some(Ok(code)) => code,
            None => 0,
        };

        let line = format!("{} -> {}", display, code);
        if let Some(cb) = callback {
            let stream = if code == 0 {
                OutputStream::Stdout
            } else {
                OutputStream::Stderr
            };
            cb.on_line(stream, &line);
        }
        Ok(CommandOutput::new(Some(code), format!("{}\n", line)))
    }
}

pub fn push_to(branch: &str) -> TriggerEvent {
    TriggerEvent::Push {
        branch: branch.to_string(),
    }
}

pub fn pull_request_into(base: &str) -> TriggerEvent {
    TriggerEvent::PullRequest {
        base: base.to_string(),
    }
}

/// Context for a run of a fixed revision of a fake repository
pub fn context_for(event: TriggerEvent) -> RunContext {
    RunContext::new("/tmp/ci-pipeline-test", event, "4f2c1e9")
        .with_repository("/srv/git/channel.git")
}

pub fn default_pipeline() -> Pipeline {
    WorkflowConfig::default_rust_protobuf().to_pipeline().unwrap()
}

pub fn pipeline_from_yaml(yaml: &str) -> Pipeline {
    WorkflowConfig::from_yaml(yaml).unwrap().to_pipeline().unwrap()
}

/// Test result from running a pipeline
#[derive(Debug, Clone)]
pub struct PipelineTestResult {
    pub pipeline: Pipeline,
    pub result: Result<(), StepFailure>,
    pub events: Vec<ExecutionEvent>,
}

impl PipelineTestResult {
    pub fn is_success(&self) -> bool {
        matches!(self.pipeline.state.status, ExecutionStatus::Succeeded)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.pipeline.state.status, ExecutionStatus::Failed)
    }

    pub fn get_step_state(&self, step_id: &str) -> Option<&StepState> {
        self.pipeline.step(step_id).map(|s| &s.state)
    }

    pub fn executed_steps(&self) -> Vec<String> {
        self.pipeline
            .executed_steps()
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn count_events(&self, matches: impl Fn(&ExecutionEvent) -> bool) -> usize {
        self.events.iter().filter(|e| matches(e)).count()
    }
}

/// Run a pipeline with the scripted runner
pub async fn run_pipeline_with_runner(
    pipeline: &mut Pipeline,
    runner: ScriptedRunner,
    context: &RunContext,
) -> PipelineTestResult {
    let engine = ExecutionEngine::new(runner);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));

    let result = engine.execute(pipeline, context).await;
    let events = events.lock().unwrap().clone();

    PipelineTestResult {
        pipeline: pipeline.clone(),
        result,
        events,
    }
}

pub fn assert_pipeline_succeeded(result: &PipelineTestResult) {
    assert!(
        result.is_success(),
        "Expected success, got {}",
        result.pipeline.state.label()
    );
    assert!(result.result.is_ok());
}

/// Assert the run ended as `failed-at-step-N`
pub fn assert_failed_at(result: &PipelineTestResult, index: usize) {
    assert!(result.is_failed(), "Expected failure, got {}", result.pipeline.state.label());
    assert_eq!(result.pipeline.state.label(), format!("failed-at-step-{}", index));
}

pub fn assert_step_skipped(result: &PipelineTestResult, step_id: &str) {
    match result.get_step_state(step_id) {
        Some(StepState::Skipped { .. }) => {}
        other => panic!("Expected step {} to be skipped, got {:?}", step_id, other),
    }
}

pub fn assert_step_succeeded(result: &PipelineTestResult, step_id: &str) {
    match result.get_step_state(step_id) {
        Some(StepState::Succeeded { .. }) => {}
        other => panic!("Expected step {} to succeed, got {:?}", step_id, other),
    }
}

pub fn assert_executed(result: &PipelineTestResult, expected: &[&str]) {
    assert_eq!(result.executed_steps(), expected);
}
