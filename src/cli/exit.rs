//! Process exit statuses

use crate::core::ExecutionStatus;
use thiserror::Error;

/// Every step succeeded, or the event did not trigger the workflow
pub const EXIT_SUCCESS: u8 = 0;
/// The run failed at a step or was interrupted
pub const EXIT_FAILED: u8 = 1;
/// The workflow or the invocation is invalid; nothing ran
pub const EXIT_CONFIG: u8 = 2;

/// An error in what the user asked for rather than in the run itself
///
/// Unknown revisions, missing repositories and unusable workspaces end up
/// here, before any step starts.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InvocationError(#[from] anyhow::Error);

/// Exit status for a run that reached `status`
pub fn for_status(status: ExecutionStatus) -> u8 {
    match status {
        ExecutionStatus::Succeeded | ExecutionStatus::Skipped => EXIT_SUCCESS,
        ExecutionStatus::Failed
        | ExecutionStatus::Cancelled
        | ExecutionStatus::Pending
        | ExecutionStatus::Running => EXIT_FAILED,
    }
}

/// Exit status for a command that returned `err`
pub fn for_error(err: &anyhow::Error) -> u8 {
    if err.is::<InvocationError>() {
        EXIT_CONFIG
    } else {
        EXIT_FAILED
    }
}
