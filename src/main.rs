use anyhow::{Context, Result};
use ci_pipeline::cli::commands::{
    EventArg, HistoryCommand, ListCommand, RunCommand, ValidateCommand,
};
use ci_pipeline::cli::exit::{self, InvocationError, EXIT_CONFIG};
use ci_pipeline::cli::output::*;
use ci_pipeline::cli::terminal_output::TerminalReporter;
use ci_pipeline::cli::{Cli, Command};
use ci_pipeline::core::config::WorkflowConfig;
use ci_pipeline::core::{ExecutionStatus, RunContext};
use ci_pipeline::execution::workspace::{current_branch, resolve_revision};
use ci_pipeline::execution::{ExecutionEngine, Workspace};
use ci_pipeline::persistence::{
    create_summary, InMemoryPersistence, PersistenceBackend, RunSummary,
};
use ci_pipeline::runner::ShellCommandRunner;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set logging subscriber: {}", e);
    }

    // Execute command
    let result = match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd, cli.quiet).await,
        Command::Validate(cmd) => validate_workflow(cmd),
        Command::List(cmd) => list_workflows(cmd).await.map(|_| ExitCode::SUCCESS),
        Command::History(cmd) => show_history(cmd).await.map(|_| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit::for_error(&e))
        }
    }
}

/// Load the workflow at `file`, or the built-in one
fn load_workflow(file: Option<&Path>) -> Result<WorkflowConfig> {
    match file {
        Some(path) => WorkflowConfig::from_file(path),
        None => {
            let config = WorkflowConfig::default_rust_protobuf();
            config.validate()?;
            Ok(config)
        }
    }
}

async fn open_history() -> Result<Arc<dyn PersistenceBackend>> {
    #[cfg(feature = "sqlite")]
    {
        let store = ci_pipeline::persistence::SqliteRunStore::with_default_path().await?;
        Ok(Arc::new(store))
    }
    #[cfg(not(feature = "sqlite"))]
    {
        tracing::warn!("Built without sqlite; run history is not kept across invocations");
        Ok(Arc::new(InMemoryPersistence::new()))
    }
}

async fn run_pipeline(cmd: &RunCommand, quiet: bool) -> Result<ExitCode> {
    let config = match load_workflow(cmd.file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            println!("{} Invalid workflow:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            return Ok(ExitCode::from(EXIT_CONFIG));
        }
    };
    let mut pipeline = config.to_pipeline()?;

    println!("{} Loaded workflow: {}", INFO, style(&pipeline.name).bold());

    // Resolve what to test before touching the workspace
    let runner = Arc::new(ShellCommandRunner::new());
    let (repo, revision, branch) = resolve_target(cmd, runner.as_ref())
        .await
        .map_err(InvocationError::from)?;
    let event = cmd.event.to_event(branch);

    let workspace = match &cmd.workspace {
        Some(path) => Workspace::at(path).map_err(InvocationError::from)?,
        None => Workspace::ephemeral()?,
    };

    let mut context = RunContext::new(workspace.path(), event, revision)
        .with_repository(repo.display().to_string());
    for (key, value) in &cmd.env {
        context.set_env(key.clone(), value.clone());
        println!(
            "{} Environment override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let store: Arc<dyn PersistenceBackend> = if cmd.no_history {
        Arc::new(InMemoryPersistence::new())
    } else {
        open_history().await?
    };

    // Create execution engine
    let engine = ExecutionEngine::new(runner);
    let reporter = Arc::new(TerminalReporter::new(quiet));
    engine.add_event_handler(move |event| reporter.on_event(&event));

    println!();
    let interrupt = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // Without a signal handler the run can only end on its own
            std::future::pending::<()>().await;
        }
    };
    let result = engine.execute_until(&mut pipeline, &context, interrupt).await;

    // Skipped runs were never triggered, so there is nothing to record
    if !cmd.no_history && pipeline.state.status != ExecutionStatus::Skipped {
        let summary = create_summary(&pipeline, &context);
        store.save_run(&summary).await?;
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(summary.run_id).dim()
        );
    }

    if cmd.keep_workspace {
        let path = workspace.keep();
        println!("{} Workspace kept at {}", INFO, style(path.display()).cyan());
    }

    // Print final status
    match pipeline.state.status {
        ExecutionStatus::Succeeded => {
            println!(
                "\n{} {} completed {}",
                CHECK,
                style(&pipeline.name).bold(),
                style("successfully").green()
            );
        }
        ExecutionStatus::Skipped => {}
        _ => {
            println!(
                "\n{} {} {}",
                CROSS,
                style(&pipeline.name).bold(),
                style(pipeline.state.label()).red()
            );
            if let Some(Err(failure)) = &result {
                error!("{}", failure);
                // Step output was hidden, show the end of the failing step's log
                let log = pipeline.step(failure.step_id()).and_then(|step| step.state.log());
                if let (true, Some(log)) = (quiet, log) {
                    println!("{}", format_output(log, 40));
                }
            }
        }
    }

    Ok(ExitCode::from(exit::for_status(pipeline.state.status)))
}

/// Canonical repository path, pinned revision and event branch for a run
async fn resolve_target(
    cmd: &RunCommand,
    runner: &ShellCommandRunner,
) -> Result<(PathBuf, String, String)> {
    let repo = cmd
        .repo
        .canonicalize()
        .with_context(|| format!("Repository not found: {}", cmd.repo.display()))?;
    let revision = resolve_revision(runner, &repo, &cmd.rev).await?;
    let branch = match (&cmd.branch, cmd.event) {
        (Some(branch), _) => branch.clone(),
        (None, EventArg::Push) => current_branch(runner, &repo).await?,
        (None, EventArg::PullRequest) => RunCommand::DEFAULT_BASE.to_string(),
    };
    Ok((repo, revision, branch))
}

fn validate_workflow(cmd: &ValidateCommand) -> Result<ExitCode> {
    println!("{} Validating workflow...", INFO);

    match load_workflow(cmd.file.as_deref()) {
        Ok(config) => {
            println!("{} Workflow configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            println!("  Environment: {}", style(config.env_vars().len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            Ok(ExitCode::from(EXIT_CONFIG))
        }
    }
}

async fn list_workflows(cmd: &ListCommand) -> Result<()> {
    let store = open_history().await?;
    let workflows = store.list_workflows().await?;

    if cmd.json {
        let mut json_data = Vec::new();
        for workflow in &workflows {
            json_data.push(serde_json::json!({
                "name": workflow,
                "run_count": store.count_runs(workflow).await?,
            }));
        }
        let data = serde_json::json!({ "workflows": json_data });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if workflows.is_empty() {
        println!("{} No workflows found in history", INFO);
        return Ok(());
    }

    println!("{} Workflows in history:", INFO);

    for workflow in &workflows {
        if cmd.with_counts {
            let total = store.count_runs(workflow).await?;
            let runs = store.list_runs(Some(workflow), total).await?;
            let succeeded = runs.iter().filter(|r| r.status == ExecutionStatus::Succeeded).count();
            let failed = runs.iter().filter(|r| r.status == ExecutionStatus::Failed).count();
            println!(
                "  {} ({} runs: {} succeeded, {} failed)",
                style(workflow).bold(),
                style(total).cyan(),
                style(succeeded).green(),
                style(failed).red()
            );
        } else {
            println!("  {}", style(workflow).bold());
        }
    }

    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_history().await?;

    // If a specific run is requested
    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(summary) if cmd.json => println!("{}", serde_json::to_string_pretty(&summary)?),
            Some(summary) => print_run_details(&summary, cmd.verbose),
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let runs = store.list_runs(cmd.workflow.as_deref(), cmd.limit).await?;

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);
    for summary in &runs {
        println!("  {}", format_run_summary(summary));
        if cmd.verbose {
            for step in &summary.steps {
                println!("      {}", format_step_summary(step));
            }
        }
    }

    Ok(())
}

fn print_run_details(summary: &RunSummary, verbose: bool) {
    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Workflow: {}", style(&summary.workflow_name).bold());
    println!("  Event: {} {}", summary.event, style(&summary.branch).cyan());
    println!("  Revision: {}", style(&summary.revision).dim());
    println!("  Status: {}", format_status(summary.status));
    println!("  Result: {}", summary.label());
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(duration) = completed.signed_duration_since(summary.started_at).to_std() {
            println!("  Duration: {}", style(format_duration(duration)).dim());
        }
    }
    println!("  Steps: {}/{}", summary.completed_steps, summary.total_steps);

    if verbose {
        for step in &summary.steps {
            println!("    {}", format_step_summary(step));
        }
    }
}
