//! Terminal reporter for pipeline runs
//!
//! Prints each [`ExecutionEvent`] as it happens: step headers such as
//! `[4/6] Check formatting`, the step's output lines, and a separator
//! between steps. In quiet mode the output is hidden and each running
//! step shows a spinner instead.
//!
//! # Example
//!
//! ```no_run
//! use ci_pipeline::cli::terminal_output::TerminalReporter;
//! use ci_pipeline::execution::ExecutionEngine;
//! use ci_pipeline::runner::ShellCommandRunner;
//! use std::sync::Arc;
//!
//! let engine = ExecutionEngine::new(ShellCommandRunner::new());
//! let reporter = Arc::new(TerminalReporter::new(false));
//! engine.add_event_handler(move |event| reporter.on_event(&event));
//! ```

use crate::cli::output::{create_spinner, format_execution_event, style};
use crate::execution::ExecutionEvent;
use crate::runner::OutputStream;
use indicatif::ProgressBar;
use std::io::{self, Write};
use std::sync::Mutex;

/// Prints execution events to the terminal
pub struct TerminalReporter {
    quiet: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalReporter {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            spinner: Mutex::new(None),
        }
    }

    /// Print a separator line spanning the terminal width
    fn print_separator(&self) {
        let width = term_size::dimensions_stdout()
            .map(|(w, _)| w)
            .unwrap_or(80);
        println!("{}", style("─".repeat(width)).dim());
    }

    fn flush_stdout(&self) {
        let _ = io::stdout().flush();
    }

    /// Replace the current spinner, clearing the old one
    fn swap_spinner(&self, next: Option<ProgressBar>) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(previous) = slot.take() {
                previous.finish_and_clear();
            }
            *slot = next;
        }
    }

    fn has_spinner(&self) -> bool {
        self.spinner.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    pub fn on_event(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::StepOutput { stream, line, .. } => {
                if self.quiet {
                    return;
                }
                match stream {
                    OutputStream::Stdout => println!("{}", line),
                    OutputStream::Stderr => eprintln!("{}", line),
                }
            }
            ExecutionEvent::StepStarted { index, total, name, .. } if self.quiet => {
                let spinner = create_spinner(format!("[{}/{}] {}", index, total, name));
                self.swap_spinner(Some(spinner));
            }
            ExecutionEvent::StepStarted { .. } => {
                self.print_separator();
                if let Some(line) = format_execution_event(event) {
                    println!("{}", line);
                }
            }
            _ => {
                self.swap_spinner(None);
                if let Some(line) = format_execution_event(event) {
                    println!("{}", line);
                }
            }
        }
        self.flush_stdout();
    }
}
