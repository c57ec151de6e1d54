//! # huddle-pipeline
//!
//! The retry controller that owns a question's whole lifecycle:
//! generation, sandboxed execution, error-driven retries, fallback-tier
//! escalation, and validation, projected onto a progress-event stream.
//!
//! - [`config`]: retry budgets and model tiers
//! - [`controller`]: the [`Pipeline`] state machine

pub mod config;
pub mod controller;

pub use config::PipelineConfig;
pub use controller::{EventStream, Pipeline};
