//! Test: Determinism - re-running an unchanged revision gives the same outcome

use crate::helpers::*;

#[tokio::test]
async fn test_rerun_gives_same_outcome() {
    for failing in [None, Some("cargo fmt"), Some("cargo test")] {
        let mut pipeline = default_pipeline();
        let context = context_for(pull_request_into("main"));
        let script = || match failing {
            Some(pattern) => ScriptedRunner::new().fail_on(pattern, 1),
            None => ScriptedRunner::new(),
        };

        let first_runner = script();
        let first = run_pipeline_with_runner(&mut pipeline, first_runner.clone(), &context).await;
        let second_runner = script();
        let second = run_pipeline_with_runner(&mut pipeline, second_runner.clone(), &context).await;

        assert_eq!(first.pipeline.state.label(), second.pipeline.state.label());
        assert_eq!(first.executed_steps(), second.executed_steps());
        assert_eq!(first_runner.command_lines(), second_runner.command_lines());
        assert_eq!(first.result, second.result);
        assert_ne!(first.pipeline.state.run_id, second.pipeline.state.run_id);
    }
}

#[tokio::test]
async fn test_rerun_after_failure_resets_step_states() {
    let mut pipeline = default_pipeline();
    let context = context_for(push_to("main"));

    let failed = run_pipeline_with_runner(
        &mut pipeline,
        ScriptedRunner::new().fail_on("cargo build", 101),
        &context,
    )
    .await;
    assert_failed_at(&failed, 5);

    let fixed = run_pipeline_with_runner(&mut pipeline, ScriptedRunner::new(), &context).await;
    assert_pipeline_succeeded(&fixed);
    assert!(fixed.pipeline.state.failed_at.is_none());
    assert_step_succeeded(&fixed, "step-6");
}
