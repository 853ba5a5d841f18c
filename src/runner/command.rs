//! Command specifications and results

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A single process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Working directory
    pub cwd: PathBuf,

    /// Variables added to the inherited process environment
    pub env: BTreeMap<String, String>,

    /// Maximum wall-clock time
    pub timeout: Duration,

    /// Shell script this command runs, if it is a `run:` step
    script: Option<String>,
}

impl CommandSpec {
    /// Execute `program` directly
    pub fn exec<I, S>(program: &str, args: I, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.into(),
            env: BTreeMap::new(),
            timeout: Duration::from_secs(3600),
            script: None,
        }
    }

    /// Run `script` with bash, failing on the first failing command or pipe
    pub fn shell(script: &str, cwd: impl Into<PathBuf>) -> Self {
        let mut spec = Self::exec(
            "bash",
            ["--noprofile", "--norc", "-eo", "pipefail", "-c", script],
            cwd,
        );
        spec.script = Some(script.to_string());
        spec
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The script for shell commands
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    /// Command line as shown in logs
    pub fn display(&self) -> String {
        match &self.script {
            Some(script) => script.trim().to_string(),
            None if self.args.is_empty() => self.program.clone(),
            None => format!("{} {}", self.program, self.args.join(" ")),
        }
    }
}

/// Result of a command that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub exit_code: Option<i32>,

    /// Interleaved stdout/stderr, one entry per line
    pub log: String,

    /// Wall-clock duration
    pub duration: Duration,
}

impl CommandOutput {
    pub fn new(exit_code: Option<i32>, log: String) -> Self {
        Self {
            exit_code,
            log,
            duration: Duration::ZERO,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}
