//! Isolated run workspaces and source repository lookups

use crate::runner::{CommandRunner, CommandSpec};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Directory a single run checks out into and executes in
#[derive(Debug)]
pub enum Workspace {
    /// Fresh temporary directory, removed when dropped
    Ephemeral(TempDir),
    /// Caller-supplied directory, left in place
    Provided(PathBuf),
}

impl Workspace {
    /// Create a fresh, empty temporary workspace
    pub fn ephemeral() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("ci-pipeline-")
            .tempdir()
            .context("Failed to create workspace directory")?;
        debug!("Created workspace {}", dir.path().display());
        Ok(Workspace::Ephemeral(dir))
    }

    /// Use `path` as the workspace, creating it if needed
    ///
    /// The directory must be empty: checkout clones into it.
    pub fn at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create workspace: {}", path.display()))?;
        let mut entries = std::fs::read_dir(&path)
            .with_context(|| format!("Failed to read workspace: {}", path.display()))?;
        if entries.next().is_some() {
            bail!("Workspace is not empty: {}", path.display());
        }
        Ok(Workspace::Provided(path))
    }

    pub fn path(&self) -> &Path {
        match self {
            Workspace::Ephemeral(dir) => dir.path(),
            Workspace::Provided(path) => path,
        }
    }

    /// Keep the directory after the run, returning its path
    pub fn keep(self) -> PathBuf {
        match self {
            Workspace::Ephemeral(dir) => {
                #[allow(deprecated)]
                let path = dir.into_path();
                info!("Keeping workspace {}", path.display());
                path
            }
            Workspace::Provided(path) => path,
        }
    }
}

/// Run `git <args>` in `repo` and return its trimmed output
async fn git<R: CommandRunner + ?Sized>(runner: &R, repo: &Path, args: &[&str]) -> Result<String> {
    let spec = CommandSpec::exec("git", args.iter().copied(), repo);
    let output = runner
        .run(&spec, None)
        .await
        .with_context(|| format!("Failed to run '{}'", spec.display()))?;
    if !output.success() {
        bail!(
            "'{}' failed in {}: {}",
            spec.display(),
            repo.display(),
            output.log.trim()
        );
    }
    Ok(output.log.trim().to_string())
}

/// Resolve `rev` in `repo` to a full commit id
pub async fn resolve_revision<R: CommandRunner + ?Sized>(
    runner: &R,
    repo: &Path,
    rev: &str,
) -> Result<String> {
    let commit = format!("{}^{{commit}}", rev);
    git(runner, repo, &["rev-parse", "--verify", "--quiet", commit.as_str()])
        .await
        .with_context(|| format!("Unknown revision '{}'", rev))
}

/// Branch currently checked out in `repo`
pub async fn current_branch<R: CommandRunner + ?Sized>(runner: &R, repo: &Path) -> Result<String> {
    let branch = git(runner, repo, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
    if branch == "HEAD" {
        bail!("{} has a detached HEAD; pass --branch", repo.display());
    }
    Ok(branch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{CommandOutput, OutputCallback, RunnerError};

    struct FixedOutput(Option<i32>, &'static str);

    #[async_trait::async_trait]
    impl CommandRunner for FixedOutput {
        async fn run(
            &self,
            _spec: &CommandSpec,
            _callback: Option<&dyn OutputCallback>,
        ) -> Result<CommandOutput, RunnerError> {
            Ok(CommandOutput::new(self.0, self.1.to_string()))
        }
    }

    #[test]
    fn test_ephemeral_workspace_is_removed_on_drop() {
        let workspace = Workspace::ephemeral().unwrap();
        let path = workspace.path().to_path_buf();
        assert!(path.is_dir());

        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn test_kept_workspace_survives() {
        let path = Workspace::ephemeral().unwrap().keep();
        assert!(path.is_dir());
        std::fs::remove_dir_all(path).unwrap();
    }

    #[test]
    fn test_provided_workspace_must_be_empty() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("ws");

        let workspace = Workspace::at(&target).unwrap();
        assert_eq!(workspace.path(), target.as_path());

        std::fs::write(target.join("leftover"), "x").unwrap();
        assert!(Workspace::at(&target).is_err());
    }

    #[tokio::test]
    async fn test_resolve_revision() {
        let runner = FixedOutput(Some(0), "0123abcd\n");
        let rev = resolve_revision(&runner, Path::new("/srv/repo"), "HEAD").await.unwrap();
        assert_eq!(rev, "0123abcd");

        let missing = FixedOutput(Some(1), "");
        assert!(resolve_revision(&missing, Path::new("/srv/repo"), "nope").await.is_err());
    }

    #[tokio::test]
    async fn test_detached_head_has_no_branch() {
        let runner = FixedOutput(Some(0), "HEAD\n");
        assert!(current_branch(&runner, Path::new("/srv/repo")).await.is_err());

        let on_main = FixedOutput(Some(0), "main\n");
        assert_eq!(current_branch(&on_main, Path::new("/srv/repo")).await.unwrap(), "main");
    }
}
