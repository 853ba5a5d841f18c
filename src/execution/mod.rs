//! Pipeline execution engine

pub mod actions;
pub mod engine;
pub mod executor;
pub mod failure;
pub mod workspace;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent, SKIPPED_AFTER_FAILURE};
pub use executor::{StepExecutor, StepOutcome};
pub use failure::{FailureCause, StepFailure};
pub use workspace::Workspace;
