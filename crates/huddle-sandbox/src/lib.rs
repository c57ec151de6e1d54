//! # huddle-sandbox
//!
//! The execution sandbox for model-authored query plans.
//!
//! A candidate program is untyped, model-supplied text. Rather than
//! evaluating it generically, the sandbox parses it into a typed
//! [`plan::QueryPlan`] and interprets that against the dataset loader
//! registry, an explicit, narrowly-scoped host boundary. The sandbox
//! enforces the output contract (a JSON object mapping, fully
//! serializable, never a raw table) and a wall-clock time budget, and
//! reports every failure as a structured [`huddle_core::ExecFailure`]
//! whose raw text feeds the next generation attempt.

pub mod interpret;
pub mod plan;
pub mod sandbox;

pub use plan::QueryPlan;
pub use sandbox::Sandbox;
