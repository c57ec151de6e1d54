//! Progress events projected onto the streaming wire protocol.
//!
//! The retry controller drives the state machine; these events are a pure
//! projection of its transitions. Each run delivers zero or more `status`
//! frames followed by exactly one terminal frame (`complete` xor `error`).

use serde::{Deserialize, Serialize};

use crate::result::PipelineResult;

/// The pipeline stage an event refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    /// Reading the question and conversation.
    Analyzing,
    /// A generation call is in flight.
    Generating,
    /// A candidate plan is executing in the sandbox.
    Executing,
    /// A failed attempt is being retried with error feedback.
    Retrying,
    /// Escalating from the primary to the fallback model tier.
    Fallback,
    /// The raw result is being judged by the validator.
    Validating,
    /// Terminal: the answer is ready.
    Done,
}

impl PipelineStep {
    /// Step label as it appears on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Analyzing => "analyzing",
            Self::Generating => "generating",
            Self::Executing => "executing",
            Self::Retrying => "retrying",
            Self::Fallback => "fallback",
            Self::Validating => "validating",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One frame on the progress stream.
///
/// Serialized shape matches the SSE `data:` payloads:
///
/// ```json
/// {"event":"status","step":"generating","message":"...","attempt":1}
/// {"event":"complete","step":"done","message":"...","data":{...}}
/// {"event":"error","step":"generating","message":"...","data":{...}}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PipelineEvent {
    /// Progress update for a state-machine transition.
    Status {
        /// The stage this update refers to.
        step: PipelineStep,
        /// Human-facing progress text.
        message: String,
        /// Global attempt index, for generate/execute/retry transitions.
        #[serde(skip_serializing_if = "Option::is_none")]
        attempt: Option<u32>,
    },
    /// Terminal: the pipeline produced an answer.
    Complete {
        /// Always [`PipelineStep::Done`].
        step: PipelineStep,
        /// Human-facing completion text.
        message: String,
        /// The full result payload.
        data: PipelineResult,
    },
    /// Terminal: the pipeline gave up.
    Error {
        /// The stage that exhausted the budgets.
        step: PipelineStep,
        /// Human-facing failure text.
        message: String,
        /// Result payload with the failure detail, when attempts were made.
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<PipelineResult>,
    },
}

impl PipelineEvent {
    /// Progress frame for a transition.
    pub fn status(step: PipelineStep, message: impl Into<String>, attempt: Option<u32>) -> Self {
        Self::Status {
            step,
            message: message.into(),
            attempt,
        }
    }

    /// Whether this is a terminal frame (`complete` or `error`).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}
