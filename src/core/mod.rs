//! Core domain models for the pipeline runner
//!
//! This module defines the fundamental data structures that represent
//! workflows, their triggers, steps, and run state.

pub mod config;
pub mod context;
pub mod pipeline;
pub mod state;
pub mod step;
pub mod trigger;

pub use context::*;
pub use pipeline::*;
pub use state::*;
pub use step::*;
pub use trigger::*;
