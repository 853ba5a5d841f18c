//! Process execution for pipeline steps

pub mod command;
pub mod error;
pub mod shell;
pub mod streaming;

use async_trait::async_trait;
pub use command::{CommandOutput, CommandSpec};
pub use error::RunnerError;
pub use shell::ShellCommandRunner;
pub use streaming::{OutputCallback, OutputStream};

/// Trait for command execution - allows for different implementations
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion, streaming its output lines to `callback`
    async fn run(
        &self,
        spec: &CommandSpec,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<CommandOutput, RunnerError>;
}

#[async_trait]
impl<R: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<R> {
    async fn run(
        &self,
        spec: &CommandSpec,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<CommandOutput, RunnerError> {
        (**self).run(spec, callback).await
    }
}
