//! Subprocess command runner

use crate::runner::{
    CommandOutput, CommandRunner, CommandSpec, OutputCallback, OutputStream, RunnerError,
};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

/// How long output still buffered after the command exits is collected.
/// A background job can hold the pipes open long after that.
const OUTPUT_GRACE: Duration = Duration::from_millis(250);

/// Runs commands as child processes of the current process
///
/// Each command leads its own process group. Both pipes are drained
/// concurrently so a chatty child never blocks. The command is done once the
/// child exits, even if a background job it started still holds the pipes.
/// On timeout, or when the run is dropped, the whole group is killed so no
/// grandchild keeps writing into the workspace.
#[derive(Debug, Clone, Default)]
pub struct ShellCommandRunner;

impl ShellCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ShellCommandRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        callback: Option<&dyn OutputCallback>,
    ) -> Result<CommandOutput, RunnerError> {
        debug!("Spawning '{}' in {}", spec.display(), spec.cwd.display());
        let started = Instant::now();

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(&spec.cwd)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|e| RunnerError::Spawn {
            program: spec.program.clone(),
            reason: e.to_string(),
        })?;
        let mut group = ProcessGroup::new(child.id());

        let (tx, mut rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, OutputStream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, OutputStream::Stderr, tx.clone()));
        }
        drop(tx);

        let mut log = String::new();
        let collect = async {
            let status = loop {
                tokio::select! {
                    status = child.wait() => break status?,
                    Some((stream, line)) = rx.recv() => {
                        record_line(&mut log, callback, stream, &line);
                    }
                }
            };
            let grace = Instant::now() + OUTPUT_GRACE;
            while let Ok(Some((stream, line))) = timeout_at(grace, rx.recv()).await {
                record_line(&mut log, callback, stream, &line);
            }
            Ok::<_, std::io::Error>(status)
        };
        let outcome = timeout(spec.timeout, collect).await;

        let status = match outcome {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(RunnerError::Io(e.to_string())),
            Err(_) => {
                warn!(
                    "'{}' exceeded {:?}, killing its process group",
                    spec.display(),
                    spec.timeout
                );
                group.kill();
                let _ = child.kill().await;
                return Err(RunnerError::Timeout(spec.timeout));
            }
        };
        // Background jobs of a command that exited on its own are left running
        group.release();

        let exit_code = status.code();
        debug!(
            "'{}' exited with {:?} after {:?}",
            spec.display(),
            exit_code,
            started.elapsed()
        );

        Ok(CommandOutput {
            exit_code,
            log,
            duration: started.elapsed(),
        })
    }
}

fn record_line(
    log: &mut String,
    callback: Option<&dyn OutputCallback>,
    stream: OutputStream,
    line: &str,
) {
    if let Some(cb) = callback {
        cb.on_line(stream, line);
    }
    log.push_str(line);
    log.push('\n');
}

/// The process group led by a spawned command, killed on drop unless released
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }

    fn release(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg only sends a signal and takes no pointers
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == -1 {
        debug!(
            "Process group {} already gone: {}",
            pgid,
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

/// Forward each line of `reader` to `tx` until EOF
async fn forward_lines<R>(
    reader: R,
    stream: OutputStream,
    tx: mpsc::UnboundedSender<(OutputStream, String)>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(|c: char| c == '\n' || c == '\r')
                    .to_string();
                if tx.send((stream, line)).is_err() {
                    break;
                }
            }
        }
    }
}
