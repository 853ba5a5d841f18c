//! CLI output formatting

use crate::{
    core::ExecutionStatus,
    execution::ExecutionEvent,
    persistence::{RunSummary, StepSummary},
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a spinner for a running step
pub fn create_spinner(message: String) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = "{spinner:.green} [{elapsed_precise}] {msg}";
    if let Ok(style) = ProgressStyle::default_spinner().template(template) {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Succeeded => style("SUCCESS").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
        ExecutionStatus::Skipped => style("SKIPPED").dim().to_string(),
        ExecutionStatus::Cancelled => style("CANCELLED").yellow().to_string(),
    }
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

/// Format a run summary as one history line
pub fn format_run_summary(summary: &RunSummary) -> String {
    let status_icon = match summary.status {
        ExecutionStatus::Succeeded => CHECK,
        ExecutionStatus::Failed => CROSS,
        ExecutionStatus::Running => SPINNER,
        ExecutionStatus::Skipped => SKIP,
        _ => WARN,
    };

    let label = match summary.status {
        ExecutionStatus::Succeeded => style(summary.label()).green(),
        ExecutionStatus::Failed => style(summary.label()).red(),
        _ => style(summary.label()).yellow(),
    };

    format!(
        "{} {} - {} - {} {}@{} - {} ({}/{})",
        status_icon,
        style(short_id(&summary.run_id)).dim(),
        style(&summary.workflow_name).bold(),
        summary.event,
        summary.branch,
        style(summary.revision.chars().take(12).collect::<String>()).cyan(),
        label,
        summary.completed_steps,
        summary.total_steps
    )
}

/// Format one step of a recorded run
pub fn format_step_summary(step: &StepSummary) -> String {
    let outcome = match step.outcome.as_str() {
        "succeeded" => style(step.outcome.as_str()).green(),
        "failed" => style(step.outcome.as_str()).red(),
        _ => style(step.outcome.as_str()).dim(),
    };
    match &step.detail {
        Some(detail) => format!(
            "{} {} - {}: {}",
            style(&step.id).dim(),
            style(&step.name).bold(),
            outcome,
            detail
        ),
        None => format!("{} {} - {}", style(&step.id).dim(), style(&step.name).bold(), outcome),
    }
}

/// Format an execution event for display
///
/// Output lines are not formatted here; the reporter echoes them raw.
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    let line = match event {
        ExecutionEvent::PipelineStarted {
            run_id,
            pipeline_name,
            total_steps,
        } => format!(
            "{} Starting pipeline {} ({}, {} steps)",
            ROCKET,
            style(pipeline_name).bold(),
            style(short_id(run_id)).dim(),
            total_steps
        ),
        ExecutionEvent::PipelineSkipped {
            pipeline_name,
            event,
            ..
        } => format!(
            "{} {} is not triggered by {}",
            SKIP,
            style(pipeline_name).bold(),
            style(event).cyan()
        ),
        ExecutionEvent::StepStarted {
            index, total, name, ..
        } => format!(
            "{} [{}/{}] {}",
            SPINNER,
            style(index).cyan(),
            style(total).dim(),
            style(name).bold()
        ),
        ExecutionEvent::StepOutput { .. } => return None,
        ExecutionEvent::StepSucceeded { step_id, duration } => format!(
            "{} {} ({})",
            CHECK,
            style(step_id).green(),
            style(format_duration(*duration)).dim()
        ),
        ExecutionEvent::StepFailed { step_id, error } => {
            format!("{} {}: {}", CROSS, style(step_id).red(), style(error).dim())
        }
        ExecutionEvent::StepSkipped { step_id, reason } => {
            format!("{} {} ({})", SKIP, style(step_id).dim(), reason)
        }
        ExecutionEvent::PipelineCompleted {
            run_id,
            status,
            failed_at,
        } => {
            let status_str = match (status, failed_at) {
                (ExecutionStatus::Succeeded, _) => style("success").green().to_string(),
                (_, Some(failed_at)) => style(failed_at).red().to_string(),
                (status, None) => format_status(*status),
            };
            format!(
                "{} Pipeline ({}) finished: {}",
                INFO,
                style(short_id(run_id)).dim(),
                status_str
            )
        }
    };
    Some(line)
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        // Keep the tail: compiler and test failures are reported last
        let tail = lines[lines.len() - max_lines..].join("\n");
        format!(
            "{}... ({} earlier lines)\n{}",
            style("[truncated]").dim(),
            lines.len() - max_lines,
            tail
        )
    }
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs < 60 {
        format!("{}.{}s", secs, duration.subsec_millis() / 100)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
