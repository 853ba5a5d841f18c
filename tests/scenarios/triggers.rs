//! Test: Triggers - which events start a run

use crate::helpers::*;
use ci_pipeline::core::{ExecutionStatus, TriggerEvent};
use ci_pipeline::execution::ExecutionEvent;

#[tokio::test]
async fn test_push_to_main_and_pull_request_into_main_trigger_once() {
    for event in [push_to("main"), pull_request_into("main")] {
        let mut pipeline = default_pipeline();
        let result = run_pipeline_with_runner(
            &mut pipeline,
            ScriptedRunner::new(),
            &context_for(event),
        )
        .await;

        assert_pipeline_succeeded(&result);
        assert_eq!(
            result.count_events(|e| matches!(e, ExecutionEvent::PipelineStarted { .. })),
            1
        );
        assert_eq!(
            result.count_events(|e| matches!(e, ExecutionEvent::PipelineCompleted { .. })),
            1
        );
    }
}

#[tokio::test]
async fn test_other_branches_are_skipped() {
    let events = [
        push_to("feature/grpc-balancing"),
        pull_request_into("release"),
        push_to("mainline"),
    ];
    for event in events {
        let mut pipeline = default_pipeline();
        let runner = ScriptedRunner::new();

        let result = run_pipeline_with_runner(
            &mut pipeline,
            runner.clone(),
            &context_for(event),
        )
        .await;

        assert_eq!(result.pipeline.state.status, ExecutionStatus::Skipped);
        assert!(result.result.is_ok());
        assert!(runner.commands().is_empty());
        assert_eq!(
            result.count_events(|e| matches!(e, ExecutionEvent::PipelineSkipped { .. })),
            1
        );
        assert_eq!(
            result.count_events(|e| matches!(e, ExecutionEvent::PipelineStarted { .. })),
            0
        );
    }
}

#[tokio::test]
async fn test_branch_globs_and_ignores() {
    let yaml = r#"
name: "Release"
on:
  push:
    branches: ["release/**"]
    branches-ignore: ["release/**-rc"]
steps:
  - run: cargo build --release
"#;
    let cases: [(TriggerEvent, bool); 4] = [
        (push_to("release/1.2"), true),
        (push_to("release/2024/q1"), true),
        (push_to("release/1.3-rc"), false),
        (pull_request_into("release/1.2"), false),
    ];

    for (event, expected) in cases {
        let mut pipeline = pipeline_from_yaml(yaml);
        let label = event.to_string();
        let result = run_pipeline_with_runner(
            &mut pipeline,
            ScriptedRunner::new(),
            &context_for(event),
        )
        .await;

        let ran = result.pipeline.state.status == ExecutionStatus::Succeeded;
        assert_eq!(ran, expected, "{}", label);
    }
}

#[tokio::test]
async fn test_workflow_without_triggers_runs_for_any_event() {
    let yaml = r#"
name: "Always"
steps:
  - run: cargo check
"#;
    let mut pipeline = pipeline_from_yaml(yaml);

    let result = run_pipeline_with_runner(
        &mut pipeline,
        ScriptedRunner::new(),
        &context_for(pull_request_into("dev")),
    )
    .await;

    assert_pipeline_succeeded(&result);
}
