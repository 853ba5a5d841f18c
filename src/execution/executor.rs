//! Step executor - runs the commands of a single step

use crate::{
    core::{RunContext, Step},
    execution::{actions, FailureCause, StepFailure},
    runner::{CommandRunner, OutputCallback},
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info};

/// Result of executing a step
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// Every command exited zero
    Succeeded { log: String, duration: Duration },
    /// A command failed; later commands of the step did not run
    Failed {
        failure: StepFailure,
        log: String,
        duration: Duration,
    },
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded { .. })
    }

    pub fn log(&self) -> &str {
        match self {
            StepOutcome::Succeeded { log, .. } | StepOutcome::Failed { log, .. } => log,
        }
    }
}

/// Executes a single step
pub struct StepExecutor<R> {
    runner: R,
}

impl<R: CommandRunner> StepExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Execute a step and return the outcome
    ///
    /// The step's timeout is a budget shared by all of its commands.
    pub async fn execute(
        &self,
        step: &Step,
        context: &RunContext,
        callback: Option<&dyn OutputCallback>,
    ) -> StepOutcome {
        info!("Executing step: {} ({})", step.id, step.name);
        let started = Instant::now();
        let deadline = started + Duration::from_secs(step.timeout_secs);
        let mut log = String::new();

        let commands = match actions::resolve(step, context) {
            Ok(commands) => commands,
            Err(cause) => {
                error!("Step {} could not be prepared: {}", step.id, cause);
                return self.failed(step, cause, log, started);
            }
        };

        for command in commands {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.failed(step, FailureCause::Timeout(step.timeout_secs), log, started);
            }

            debug!("Step {} running: {}", step.id, command.display());
            log.push_str(&format!("$ {}\n", command.display()));

            let result = self
                .runner
                .run(&command.with_timeout(remaining), callback)
                .await;

            match result {
                Ok(output) => {
                    log.push_str(&output.log);
                    match output.exit_code {
                        Some(0) => {}
                        Some(code) => {
                            error!("Step {} exited with code {}", step.id, code);
                            return self.failed(step, FailureCause::ExitCode(code), log, started);
                        }
                        None => {
                            error!("Step {} was terminated by a signal", step.id);
                            return self.failed(step, FailureCause::Signal, log, started);
                        }
                    }
                }
                Err(e) => {
                    error!("Step {} failed to run: {}", step.id, e);
                    let cause = match e {
                        // Report the step's own budget, not the remainder
                        crate::runner::RunnerError::Timeout(_) => {
                            FailureCause::Timeout(step.timeout_secs)
                        }
                        other => other.into(),
                    };
                    return self.failed(step, cause, log, started);
                }
            }
        }

        info!("Step {} completed successfully", step.id);
        StepOutcome::Succeeded {
            log,
            duration: started.elapsed(),
        }
    }

    fn failed(
        &self,
        step: &Step,
        cause: FailureCause,
        log: String,
        started: Instant,
    ) -> StepOutcome {
        StepOutcome::Failed {
            failure: StepFailure::new(step.category, &step.id, cause),
            log,
            duration: started.elapsed(),
        }
    }
}
