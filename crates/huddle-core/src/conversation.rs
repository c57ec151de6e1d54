//! Conversation turns as supplied by the caller.
//!
//! The pipeline receives the conversation by value and never mutates it.
//! Retry context is synthesized per-attempt inside the generation client
//! and is never written back here.

use serde::{Deserialize, Serialize};

/// Who authored a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user asking a question.
    User,
    /// A prior pipeline answer.
    Assistant,
}

/// One turn in a multi-turn conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who authored this turn.
    pub role: Role,
    /// The turn's text content.
    pub content: String,
}

impl ConversationTurn {
    /// Convenience constructor for a user turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Convenience constructor for an assistant turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The most recent user turn in a conversation, if any.
///
/// The pipeline validates against this before spending any attempt budget:
/// a conversation without a user turn has no question to answer.
#[must_use]
pub fn latest_user_content(turns: &[ConversationTurn]) -> Option<&str> {
    turns
        .iter()
        .rev()
        .find(|t| t.role == Role::User)
        .map(|t| t.content.as_str())
}
