//! Streaming support for command output
//!
//! While a command runs, each line it writes to stdout or stderr is handed
//! to an [`OutputCallback`] as soon as it arrives, so step logs can be shown
//! live and attributed to the step that produced them.
//!
//! # Example
//!
//! ```
//! use ci_pipeline::runner::{OutputCallback, OutputStream};
//!
//! struct LivePrinter;
//!
//! impl OutputCallback for LivePrinter {
//!     fn on_line(&self, stream: OutputStream, line: &str) {
//!         match stream {
//!             OutputStream::Stdout => println!("{}", line),
//!             OutputStream::Stderr => eprintln!("{}", line),
//!         }
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Which pipe a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Callback for processing output lines as they arrive
///
/// This trait is object-safe and can be used as `&dyn OutputCallback`.
pub trait OutputCallback: Send + Sync {
    /// Called once per line, without the trailing newline
    fn on_line(&self, stream: OutputStream, line: &str);
}
