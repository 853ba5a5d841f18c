//! ci-pipeline - A local CI pipeline runner for fail-fast build/test workflows

pub mod cli;
pub mod core;
pub mod execution;
pub mod persistence;
pub mod runner;

// Re-export commonly used types
pub use core::{ExecutionStatus, Pipeline, RunContext, Step, StepState, TriggerEvent};
pub use execution::{ExecutionEngine, ExecutionEvent, StepFailure};
pub use runner::{CommandRunner, ShellCommandRunner};
