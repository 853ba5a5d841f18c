//! Command runner error types

use std::time::Duration;
use thiserror::Error;

/// Error types for command execution
///
/// A command that runs and exits non-zero is not an error here; that is
/// reported through `CommandOutput::exit_code`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunnerError {
    #[error("failed to start '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(String),
}
