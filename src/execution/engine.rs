//! Main execution engine - orchestrates the entire pipeline run

use crate::{
    core::{ExecutionStatus, FailedAt, Pipeline, RunContext, StepState, TriggerEvent},
    execution::{StepExecutor, StepFailure, StepOutcome},
    runner::{CommandRunner, OutputCallback, OutputStream},
};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        run_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    /// The event did not match the workflow's triggers
    PipelineSkipped {
        run_id: Uuid,
        pipeline_name: String,
        event: TriggerEvent,
    },
    StepStarted {
        step_id: String,
        index: usize,
        total: usize,
        name: String,
    },
    StepOutput {
        step_id: String,
        stream: OutputStream,
        line: String,
    },
    StepSucceeded {
        step_id: String,
        duration: Duration,
    },
    StepFailed {
        step_id: String,
        error: String,
    },
    StepSkipped {
        step_id: String,
        reason: String,
    },
    PipelineCompleted {
        run_id: Uuid,
        status: ExecutionStatus,
        failed_at: Option<FailedAt>,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Reason recorded on steps that never ran because an earlier one failed
pub const SKIPPED_AFTER_FAILURE: &str = "previous step failed";

/// Main pipeline execution engine
pub struct ExecutionEngine<R> {
    executor: StepExecutor<R>,
    event_handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl<R: CommandRunner> ExecutionEngine<R> {
    pub fn new(runner: R) -> Self {
        Self {
            executor: StepExecutor::new(runner),
            event_handlers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.event_handlers.lock() {
            handlers.push(Arc::new(handler));
        }
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        emit(&self.event_handlers, event);
    }

    /// Execute the entire pipeline for the event in `context`
    ///
    /// Steps run strictly in order. The first failing step ends the run:
    /// every later step is marked skipped and never executes. A pipeline that
    /// has already run is reset first, so each call is a fresh run.
    pub async fn execute(
        &self,
        pipeline: &mut Pipeline,
        context: &RunContext,
    ) -> Result<(), StepFailure> {
        if pipeline.state.status != ExecutionStatus::Pending {
            pipeline.reset();
        }
        let run_id = pipeline.state.run_id;
        let total = pipeline.steps.len();

        if !pipeline.is_triggered_by(&context.event) {
            info!(
                "Pipeline '{}' is not triggered by {}, skipping",
                pipeline.name, context.event
            );
            for step in &mut pipeline.steps {
                step.state = StepState::Skipped {
                    reason: format!("not triggered by {}", context.event),
                };
            }
            pipeline.state.skip();
            self.emit_event(ExecutionEvent::PipelineSkipped {
                run_id,
                pipeline_name: pipeline.name.clone(),
                event: context.event.clone(),
            });
            return Ok(());
        }

        info!("Starting pipeline execution: {} ({})", pipeline.name, run_id);
        pipeline.state.start(total);
        self.emit_event(ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name: pipeline.name.clone(),
            total_steps: total,
        });

        // Invocation env wins over the workflow's
        let mut env = pipeline.env.clone();
        env.extend(context.env.clone());
        let context = RunContext {
            env,
            ..context.clone()
        };

        while let Some(position) = pipeline.next_pending() {
            if let Err(failure) = self.execute_step(pipeline, position, &context).await {
                let step = &pipeline.steps[position];
                let failed_at = FailedAt {
                    index: step.index,
                    step_id: step.id.clone(),
                    category: step.category,
                };
                self.skip_remaining(pipeline, position + 1);
                debug_assert!(pipeline.is_complete());
                error!(
                    "Pipeline '{}' {}: {}",
                    pipeline.name, failed_at, failure
                );
                pipeline.state.fail(failed_at.clone());
                self.emit_event(ExecutionEvent::PipelineCompleted {
                    run_id,
                    status: ExecutionStatus::Failed,
                    failed_at: Some(failed_at),
                });
                return Err(failure);
            }
        }

        pipeline.state.succeed();
        info!("Pipeline execution finished: {} - success", pipeline.name);
        self.emit_event(ExecutionEvent::PipelineCompleted {
            run_id,
            status: ExecutionStatus::Succeeded,
            failed_at: None,
        });
        Ok(())
    }

    /// Execute the pipeline unless `interrupt` resolves first
    ///
    /// An interrupted run is marked cancelled and `None` is returned. The
    /// command that was running is dropped, which kills its process group.
    pub async fn execute_until<F>(
        &self,
        pipeline: &mut Pipeline,
        context: &RunContext,
        interrupt: F,
    ) -> Option<Result<(), StepFailure>>
    where
        F: Future<Output = ()>,
    {
        let result = tokio::select! {
            result = self.execute(pipeline, context) => Some(result),
            _ = interrupt => None,
        };

        if result.is_none() {
            warn!("Pipeline '{}' interrupted, cancelling run", pipeline.name);
            pipeline.state.cancel();
            self.emit_event(ExecutionEvent::PipelineCompleted {
                run_id: pipeline.state.run_id,
                status: ExecutionStatus::Cancelled,
                failed_at: None,
            });
        }
        result
    }

    /// Execute a single step
    async fn execute_step(
        &self,
        pipeline: &mut Pipeline,
        position: usize,
        context: &RunContext,
    ) -> Result<(), StepFailure> {
        let total = pipeline.steps.len();
        let started_at = chrono::Utc::now();
        let step = {
            let step = &mut pipeline.steps[position];
            step.state = StepState::Running { started_at };
            step.clone()
        };

        self.emit_event(ExecutionEvent::StepStarted {
            step_id: step.id.clone(),
            index: step.index,
            total,
            name: step.name.clone(),
        });

        let forwarder = EventForwarder {
            step_id: step.id.clone(),
            handlers: self.event_handlers.clone(),
        };
        let outcome = self.executor.execute(&step, context, Some(&forwarder)).await;

        match outcome {
            StepOutcome::Succeeded { log, duration } => {
                pipeline.steps[position].state = StepState::Succeeded {
                    log,
                    started_at,
                    completed_at: chrono::Utc::now(),
                };
                pipeline.state.completed_steps += 1;
                self.emit_event(ExecutionEvent::StepSucceeded {
                    step_id: step.id,
                    duration,
                });
                Ok(())
            }
            StepOutcome::Failed { failure, log, .. } => {
                pipeline.steps[position].state = StepState::Failed {
                    error: failure.to_string(),
                    exit_code: failure.exit_code(),
                    log,
                    started_at,
                    failed_at: chrono::Utc::now(),
                };
                self.emit_event(ExecutionEvent::StepFailed {
                    step_id: step.id,
                    error: failure.to_string(),
                });
                Err(failure)
            }
        }
    }

    /// Mark every step from `from` on as skipped
    fn skip_remaining(&self, pipeline: &mut Pipeline, from: usize) {
        for step in pipeline.steps.iter_mut().skip(from) {
            if matches!(step.state, StepState::Pending) {
                warn!("Skipping step {}: {}", step.id, SKIPPED_AFTER_FAILURE);
                step.state = StepState::Skipped {
                    reason: SKIPPED_AFTER_FAILURE.to_string(),
                };
                emit(
                    &self.event_handlers,
                    ExecutionEvent::StepSkipped {
                        step_id: step.id.clone(),
                        reason: SKIPPED_AFTER_FAILURE.to_string(),
                    },
                );
            }
        }
    }
}

fn emit(handlers: &Mutex<Vec<EventHandler>>, event: ExecutionEvent) {
    // Snapshot so a handler can register further handlers without deadlocking
    let handlers: Vec<EventHandler> = match handlers.lock() {
        Ok(handlers) => handlers.clone(),
        Err(_) => return,
    };
    for handler in handlers {
        handler(event.clone());
    }
}

/// Turns output lines of the running step into `StepOutput` events
struct EventForwarder {
    step_id: String,
    handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl OutputCallback for EventForwarder {
    fn on_line(&self, stream: OutputStream, line: &str) {
        emit(
            &self.handlers,
            ExecutionEvent::StepOutput {
                step_id: self.step_id.clone(),
                stream,
                line: line.to_string(),
            },
        );
    }
}
