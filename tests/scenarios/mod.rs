//! Scenario-based tests for ci-pipeline

mod determinism;
mod environment;
mod fail_fast;
mod success_path;
mod triggers;
