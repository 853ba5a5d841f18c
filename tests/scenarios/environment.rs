//! Test: Environment - what every step sees

use crate::helpers::*;
use std::path::Path;

#[tokio::test]
async fn test_cargo_term_color_set_for_every_step() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new();

    run_pipeline_with_runner(&mut pipeline, runner.clone(), &context_for(push_to("main"))).await;

    let commands = runner.commands();
    assert_eq!(commands.len(), 8);
    for command in &commands {
        assert_eq!(
            command.env.get("CARGO_TERM_COLOR").map(String::as_str),
            Some("always"),
            "{}",
            command.display
        );
        assert_eq!(command.env.get("CI").map(String::as_str), Some("true"));
        assert_eq!(command.env.get("CI_SHA").map(String::as_str), Some("4f2c1e9"));
    }
}

#[tokio::test]
async fn test_event_is_exposed_to_steps() {
    let mut pipeline = default_pipeline();
    let runner = ScriptedRunner::new();

    run_pipeline_with_runner(
        &mut pipeline,
        runner.clone(),
        &context_for(pull_request_into("main")),
    )
    .await;

    let first = &runner.commands()[0];
    assert_eq!(first.env.get("CI_EVENT_NAME").map(String::as_str), Some("pull_request"));
    assert_eq!(first.env.get("CI_REF").map(String::as_str), Some("main"));
}

#[tokio::test]
async fn test_env_precedence() {
    let yaml = r#"
name: "Env"
env:
  LEVEL: workflow
  PROFILE: dev
steps:
  - run: cargo build
    env:
      LEVEL: step
  - run: cargo test
"#;
    let mut pipeline = pipeline_from_yaml(yaml);
    let runner = ScriptedRunner::new();
    let mut context = context_for(push_to("main"));
    context.set_env("PROFILE".to_string(), "release".to_string());

    run_pipeline_with_runner(&mut pipeline, runner.clone(), &context).await;

    let commands = runner.commands();
    // step env over invocation env over workflow env
    assert_eq!(commands[0].env.get("LEVEL").map(String::as_str), Some("step"));
    assert_eq!(commands[1].env.get("LEVEL").map(String::as_str), Some("workflow"));
    assert_eq!(commands[0].env.get("PROFILE").map(String::as_str), Some("release"));
}

#[tokio::test]
async fn test_steps_run_in_workspace() {
    let yaml = r#"
name: "Dirs"
steps:
  - run: cargo build
  - run: cargo test
    working-directory: crates/balancer
"#;
    let mut pipeline = pipeline_from_yaml(yaml);
    let runner = ScriptedRunner::new();

    run_pipeline_with_runner(&mut pipeline, runner.clone(), &context_for(push_to("main"))).await;

    let commands = runner.commands();
    assert_eq!(commands[0].cwd, Path::new("/tmp/ci-pipeline-test"));
    assert_eq!(commands[1].cwd, Path::new("/tmp/ci-pipeline-test/crates/balancer"));
}
