//! # huddle-core
//!
//! Foundation types shared across the huddle pipeline crates:
//!
//! - [`conversation`]: caller-owned conversation turns
//! - [`outcome`]: candidate programs, execution outcomes, the error taxonomy
//! - [`events`]: progress events projected onto the wire protocol
//! - [`result`]: the terminal pipeline result and validation verdict
//!
//! This crate performs no I/O and holds no async machinery.

pub mod conversation;
pub mod events;
pub mod outcome;
pub mod result;

pub use conversation::{ConversationTurn, Role};
pub use events::{PipelineEvent, PipelineStep};
pub use outcome::{Attempt, CandidateProgram, ExecErrorKind, ExecFailure, ExecutionOutcome, ModelTier};
pub use result::{PipelineResult, ValidationVerdict};
