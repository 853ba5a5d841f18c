//! Resolve steps into the concrete commands they run

use crate::core::{ActionKind, ActionRef, RunContext, Step, StepAction};
use crate::execution::FailureCause;
use crate::runner::CommandSpec;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Commands for `step`, in the order they must run
///
/// Timeouts are left at their defaults; the executor assigns them from the
/// step's budget.
pub fn resolve(step: &Step, ctx: &RunContext) -> Result<Vec<CommandSpec>, FailureCause> {
    let cwd = ctx.step_dir(step);
    let env = ctx.step_env(step);

    let commands = match &step.action {
        StepAction::Run { command } => vec![CommandSpec::shell(command, cwd)],
        StepAction::Uses { action, with } => match action.kind {
            ActionKind::Checkout => checkout(ctx, with)?,
            ActionKind::RustToolchain => rust_toolchain(action, with, ctx),
            ActionKind::SetupProtoc => setup_protoc(ctx),
        },
    };

    Ok(commands.into_iter().map(|c| c.with_env(env.clone())).collect())
}

/// Clone the repository into the (empty) workspace and detach at the revision
fn checkout(
    ctx: &RunContext,
    with: &BTreeMap<String, String>,
) -> Result<Vec<CommandSpec>, FailureCause> {
    let repository = with
        .get("repository")
        .cloned()
        .or_else(|| ctx.repository.clone())
        .ok_or_else(|| FailureCause::Setup("no repository to check out".to_string()))?;
    let revision = with.get("ref").cloned().unwrap_or_else(|| ctx.revision.clone());
    let workspace = ctx.workspace().to_path_buf();

    Ok(vec![
        CommandSpec::exec(
            "git",
            ["clone", "--quiet", "--no-checkout", repository.as_str(), "."],
            workspace.clone(),
        ),
        CommandSpec::exec(
            "git",
            [
                "-c",
                "advice.detachedHead=false",
                "checkout",
                "--quiet",
                "--detach",
                revision.as_str(),
            ],
            workspace,
        ),
    ])
}

/// Install the toolchain and pin it for the workspace
fn rust_toolchain(
    action: &ActionRef,
    with: &BTreeMap<String, String>,
    ctx: &RunContext,
) -> Vec<CommandSpec> {
    let toolchain = toolchain_name(action, with);
    let profile = with.get("profile").cloned().unwrap_or_else(|| "minimal".to_string());

    let mut components: Vec<String> = with
        .get("components")
        .map(|c| {
            c.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();
    // The format check step needs rustfmt even on the minimal profile
    if components.is_empty() {
        components.push("rustfmt".to_string());
    }

    let mut install = vec![
        "toolchain".to_string(),
        "install".to_string(),
        toolchain.clone(),
        "--profile".to_string(),
        profile,
    ];
    for component in components {
        install.push("--component".to_string());
        install.push(component);
    }

    let workspace = ctx.workspace().to_path_buf();
    vec![
        CommandSpec::exec("rustup", install, workspace.clone()),
        CommandSpec::exec("rustup", ["override", "set", toolchain.as_str()], workspace),
    ]
}

/// `with.toolchain`, else the action ref when it names a toolchain, else `stable`
fn toolchain_name(action: &ActionRef, with: &BTreeMap<String, String>) -> String {
    static ACTION_VERSION: OnceLock<Option<Regex>> = OnceLock::new();
    let action_version = ACTION_VERSION.get_or_init(|| Regex::new(r"^v\d+(\.\d+)*$").ok());

    if let Some(toolchain) = with.get("toolchain") {
        return toolchain.clone();
    }
    match (&action.kind, &action.git_ref) {
        (ActionKind::RustToolchain, Some(git_ref))
            if action.name == "dtolnay/rust-toolchain"
                && !action_version.as_ref().is_some_and(|re| re.is_match(git_ref))
                && git_ref != "master" =>
        {
            git_ref.clone()
        }
        _ => "stable".to_string(),
    }
}

/// Verify a protobuf compiler is available to the build
fn setup_protoc(ctx: &RunContext) -> Vec<CommandSpec> {
    vec![CommandSpec::exec(
        "protoc",
        ["--version"],
        ctx.workspace().to_path_buf(),
    )]
}
