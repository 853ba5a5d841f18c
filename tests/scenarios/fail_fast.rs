//! Test: Fail Fast - the first failing step ends the run

use crate::helpers::*;
use ci_pipeline::core::{StepCategory, StepState};
use ci_pipeline::execution::{FailureCause, StepFailure, SKIPPED_AFTER_FAILURE};
use ci_pipeline::runner::RunnerError;
use std::time::Duration;

#[tokio::test]
async fn test_format_failure_skips_build_and_test() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new().fail_on("cargo fmt", 1);

    let result = run_pipeline_with_runner(
        &mut pipeline,
        runner.clone(),
        &context_for(push_to("main")),
    )
    .await;

    assert_failed_at(&result, 4);
    assert!(matches!(result.result, Err(StepFailure::FormatViolation { .. })));
    assert!(!runner.ran("cargo build"));
    assert!(!runner.ran("cargo test"));
    assert_step_skipped(&result, "step-5");
    assert_step_skipped(&result, "step-6");
}

#[tokio::test]
async fn test_build_failure_skips_test() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new().fail_on("cargo build", 101);

    let result = run_pipeline_with_runner(
        &mut pipeline,
        runner.clone(),
        &context_for(push_to("main")),
    )
    .await;

    assert_failed_at(&result, 5);
    assert!(runner.ran("cargo fmt --check"));
    assert!(!runner.ran("cargo test"));
    assert_step_succeeded(&result, "step-4");
    assert_step_skipped(&result, "step-6");

    match result.get_step_state("step-5") {
        Some(StepState::Failed { exit_code, error, .. }) => {
            assert_eq!(*exit_code, Some(101));
            assert!(error.contains("compilation failed"));
        }
        other => panic!("Expected build to fail, got {:?}", other),
    }
}

#[tokio::test]
async fn test_test_failure_is_last_step() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new().fail_on("cargo test", 101);

    let result = run_pipeline_with_runner(
        &mut pipeline,
        runner,
        &context_for(push_to("main")),
    )
    .await;

    assert_failed_at(&result, 6);
    assert!(matches!(result.result, Err(StepFailure::TestFailure { .. })));
    assert_eq!(result.pipeline.state.completed_steps, 5);
}

#[tokio::test]
async fn test_each_step_failure_is_classified() {
    let cases = [
        ("git clone", 1, StepCategory::Checkout),
        ("rustup toolchain install", 2, StepCategory::ToolchainInstall),
        ("protoc", 3, StepCategory::CompilerInstall),
        ("cargo fmt", 4, StepCategory::FormatCheck),
        ("cargo build", 5, StepCategory::Build),
        ("cargo test", 6, StepCategory::Test),
    ];

    for (pattern, index, category) in cases {
        let mut pipeline = default_pipeline();
        let runner = ScriptedRunner::new().fail_on(pattern, 1);

        let result = run_pipeline_with_runner(
            &mut pipeline,
            runner,
            &context_for(push_to("main")),
        )
        .await;

        assert_failed_at(&result, index);
        let failure = result.result.as_ref().unwrap_err();
        assert_eq!(failure.category(), category, "failing on {}", pattern);
        assert_eq!(result.pipeline.state.failed_at.as_ref().unwrap().category, category);
        assert_eq!(result.executed_steps().len(), index);
    }
}

#[tokio::test]
async fn test_checkout_stops_before_detaching() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new().fail_on("git clone", 128);

    let result = run_pipeline_with_runner(
        &mut pipeline,
        runner.clone(),
        &context_for(push_to("main")),
    )
    .await;

    assert_failed_at(&result, 1);
    assert_eq!(runner.command_lines().len(), 1);
    for id in ["step-2", "step-3", "step-4", "step-5", "step-6"] {
        assert_step_skipped(&result, id);
    }
}

#[tokio::test]
async fn test_missing_protoc_fails_compiler_install() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new().error_on(
        "protoc",
        RunnerError::Spawn {
            program: "protoc".to_string(),
            reason: "No such file or directory (os error 2)".to_string(),
        },
    );

    let result = run_pipeline_with_runner(
        &mut pipeline,
        runner,
        &context_for(push_to("main")),
    )
    .await;

    assert_failed_at(&result, 3);
    match &result.result {
        Err(StepFailure::CompilerInstall { cause, .. }) => {
            assert!(matches!(cause, FailureCause::Spawn(_)));
        }
        other => panic!("Expected compiler install failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_fails_step() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new()
        .error_on("cargo test", RunnerError::Timeout(Duration::from_secs(3600)));

    let result = run_pipeline_with_runner(
        &mut pipeline,
        runner,
        &context_for(push_to("main")),
    )
    .await;

    assert_failed_at(&result, 6);
    assert_eq!(
        result.result.as_ref().unwrap_err().cause(),
        &FailureCause::Timeout(3600)
    );
}

#[tokio::test]
async fn test_no_retries() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new().fail_on("cargo build", 101);

    run_pipeline_with_runner(&mut pipeline, runner.clone(), &context_for(push_to("main"))).await;

    let builds = runner
        .command_lines()
        .into_iter()
        .filter(|c| c.contains("cargo build"))
        .count();
    assert_eq!(builds, 1);
}

#[tokio::test]
async fn test_skip_reason_is_recorded() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new().fail_on("cargo fmt", 1);

    let result = run_pipeline_with_runner(
        &mut pipeline,
        runner,
        &context_for(push_to("main")),
    )
    .await;

    match result.get_step_state("step-6") {
        Some(StepState::Skipped { reason }) => assert_eq!(reason, SKIPPED_AFTER_FAILURE),
        other => panic!("Expected skip, got {:?}", other),
    }
}
