//! Test: Success Path - every step runs once, in order

use crate::helpers::*;
use ci_pipeline::core::ExecutionStatus;
use ci_pipeline::execution::ExecutionEvent;

#[tokio::test]
async fn test_all_six_steps_succeed() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new();

    let result = run_pipeline_with_runner(
        &mut pipeline,
        runner.clone(),
        &context_for(push_to("main")),
    )
    .await;

    assert_pipeline_succeeded(&result);
    assert_eq!(result.pipeline.state.label(), "success");
    assert_executed(
        &result,
        &["step-1", "step-2", "step-3", "step-4", "step-5", "step-6"],
    );
    assert_eq!(result.pipeline.state.completed_steps, 6);
}

#[tokio::test]
async fn test_commands_run_in_order() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new();

    run_pipeline_with_runner(&mut pipeline, runner.clone(), &context_for(push_to("main"))).await;

    assert_eq!(
        runner.command_lines(),
        vec![
            "git clone --quiet --no-checkout /srv/git/channel.git .",
            "git -c advice.detachedHead=false checkout --quiet --detach 4f2c1e9",
            "rustup toolchain install stable --profile minimal --component rustfmt",
            "rustup override set stable",
            "protoc --version",
            "cargo fmt --check",
            "cargo build --verbose",
            "cargo test --verbose --all-features",
        ]
    );
}

#[tokio::test]
async fn test_step_logs_are_attributed() {
    let mut pipeline = default_pipeline();

    let result = run_pipeline_with_runner(
        &mut pipeline,
        ScriptedRunner::new(),
        &context_for(push_to("main")),
    )
    .await;

    let build_log = result.pipeline.step("step-5").and_then(|s| s.state.log()).unwrap();
    assert!(build_log.contains("$ cargo build --verbose"));
    assert!(!build_log.contains("cargo test"));
}

#[tokio::test]
async fn test_success_events() {
    let mut pipeline = default_pipeline();

    let result = run_pipeline_with_runner(
        &mut pipeline,
        ScriptedRunner::new(),
        &context_for(push_to("main")),
    )
    .await;

    assert_eq!(
        result.count_events(|e| matches!(e, ExecutionEvent::StepStarted { .. })),
        6
    );
    assert_eq!(
        result.count_events(|e| matches!(e, ExecutionEvent::StepSucceeded { .. })),
        6
    );
    assert_eq!(
        result.count_events(|e| matches!(e, ExecutionEvent::StepOutput { .. })),
        8
    );
    assert!(matches!(
        result.events.last(),
        Some(ExecutionEvent::PipelineCompleted {
            status: ExecutionStatus::Succeeded,
            failed_at: None,
            ..
        })
    ));
}

#[tokio::test]
async fn test_custom_workflow_runs_its_own_steps() {
    let yaml = r#"
name: "Lint"
on: push
steps:
  - name: Clippy
    run: cargo clippy --all-targets -- -D warnings
  - id: docs
    run: cargo doc --no-deps
"#;
    let mut pipeline = pipeline_from_yaml(yaml);
    let runner = ScriptedRunner::new();

    let result = run_pipeline_with_runner(
        &mut pipeline,
        runner.clone(),
        &context_for(push_to("topic")),
    )
    .await;

    assert_pipeline_succeeded(&result);
    assert_executed(&result, &["step-1", "docs"]);
    assert_eq!(
        runner.command_lines(),
        vec!["cargo clippy --all-targets -- -D warnings", "cargo doc --no-deps"]
    );
}
