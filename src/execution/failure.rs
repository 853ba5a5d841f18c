//! Step failure taxonomy

use crate::core::StepCategory;
use crate::runner::RunnerError;
use thiserror::Error;

/// Why a step's command did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureCause {
    #[error("exited with code {0}")]
    ExitCode(i32),

    #[error("terminated by signal")]
    Signal,

    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("could not start: {0}")]
    Spawn(String),

    #[error("{0}")]
    Setup(String),
}

impl From<RunnerError> for FailureCause {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Spawn { program, reason } => {
                FailureCause::Spawn(format!("{}: {}", program, reason))
            }
            RunnerError::Timeout(limit) => {
                // Round up so a sub-second limit never reads as zero
                let secs = limit.as_secs() + u64::from(limit.subsec_nanos() > 0);
                FailureCause::Timeout(secs)
            }
            RunnerError::Io(msg) => FailureCause::Setup(msg),
        }
    }
}

/// A failed step, classified by what the step was doing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepFailure {
    #[error("checkout failed in step '{step_id}': {cause}")]
    Checkout { step_id: String, cause: FailureCause },

    #[error("toolchain install failed in step '{step_id}': {cause}")]
    ToolchainInstall { step_id: String, cause: FailureCause },

    #[error("protobuf compiler install failed in step '{step_id}': {cause}")]
    CompilerInstall { step_id: String, cause: FailureCause },

    #[error("formatting check failed in step '{step_id}': {cause}")]
    FormatViolation { step_id: String, cause: FailureCause },

    #[error("compilation failed in step '{step_id}': {cause}")]
    Compilation { step_id: String, cause: FailureCause },

    #[error("tests failed in step '{step_id}': {cause}")]
    TestFailure { step_id: String, cause: FailureCause },

    #[error("command failed in step '{step_id}': {cause}")]
    Command { step_id: String, cause: FailureCause },
}

impl StepFailure {
    pub fn new(category: StepCategory, step_id: &str, cause: FailureCause) -> Self {
        let step_id = step_id.to_string();
        match category {
            StepCategory::Checkout => StepFailure::Checkout { step_id, cause },
            StepCategory::ToolchainInstall => StepFailure::ToolchainInstall { step_id, cause },
            StepCategory::CompilerInstall => StepFailure::CompilerInstall { step_id, cause },
            StepCategory::FormatCheck => StepFailure::FormatViolation { step_id, cause },
            StepCategory::Build => StepFailure::Compilation { step_id, cause },
            StepCategory::Test => StepFailure::TestFailure { step_id, cause },
            StepCategory::Command => StepFailure::Command { step_id, cause },
        }
    }

    pub fn category(&self) -> StepCategory {
        match self {
            StepFailure::Checkout { .. } => StepCategory::Checkout,
            StepFailure::ToolchainInstall { .. } => StepCategory::ToolchainInstall,
            StepFailure::CompilerInstall { .. } => StepCategory::CompilerInstall,
            StepFailure::FormatViolation { .. } => StepCategory::FormatCheck,
            StepFailure::Compilation { .. } => StepCategory::Build,
            StepFailure::TestFailure { .. } => StepCategory::Test,
            StepFailure::Command { .. } => StepCategory::Command,
        }
    }

    pub fn step_id(&self) -> &str {
        match self {
            StepFailure::Checkout { step_id, .. }
            | StepFailure::ToolchainInstall { step_id, .. }
            | StepFailure::CompilerInstall { step_id, .. }
            | StepFailure::FormatViolation { step_id, .. }
            | StepFailure::Compilation { step_id, .. }
            | StepFailure::TestFailure { step_id, .. }
            | StepFailure::Command { step_id, .. } => step_id,
        }
    }

    pub fn cause(&self) -> &FailureCause {
        match self {
            StepFailure::Checkout { cause, .. }
            | StepFailure::ToolchainInstall { cause, .. }
            | StepFailure::CompilerInstall { cause, .. }
            | StepFailure::FormatViolation { cause, .. }
            | StepFailure::Compilation { cause, .. }
            | StepFailure::TestFailure { cause, .. }
            | StepFailure::Command { cause, .. } => cause,
        }
    }

    /// Exit code of the failing command, if it exited normally
    pub fn exit_code(&self) -> Option<i32> {
        match self.cause() {
            FailureCause::ExitCode(code) => Some(*code),
            _ => None,
        }
    }
}
