//! # Language-Model Backend Trait
//!
//! Core abstraction over chat-completion backends. The pipeline only ever
//! talks to [`LanguageModel`]; the concrete HTTP client lives in
//! [`crate::openai`] and tests substitute scripted fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur while talking to a model backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend returned an API error.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
    },

    /// The response carried neither a tool call nor text.
    #[error("empty completion: the backend returned no content")]
    EmptyCompletion,
}

impl BackendError {
    /// Whether a fresh attempt against the same backend could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Json(_) | Self::EmptyCompletion => false,
        }
    }

    /// Error category string for logging and metrics.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Http(_) => "network",
            Self::Json(_) => "parse",
            Self::Api { .. } => "api",
            Self::EmptyCompletion => "empty",
        }
    }
}

/// Role of one chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions.
    System,
    /// End-user content.
    User,
    /// Model output fed back as history.
    Assistant,
}

/// One message in a completion request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A tool the model can be forced to call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name, referenced by `tool_choice`.
    pub name: String,
    /// What the tool does, shown to the model.
    pub description: String,
    /// JSON Schema of the tool's arguments.
    pub parameters: Value,
}

/// One completion request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Model identifier, e.g. `gpt-5.1-mini`.
    pub model: String,
    /// Conversation so far, system message first.
    pub messages: Vec<ChatMessage>,
    /// Tool the model may call.
    pub tool: Option<ToolSpec>,
    /// Force the model to call `tool` rather than answer in prose.
    pub force_tool: bool,
    /// Request a JSON-object response body instead of free text.
    pub json_response: bool,
}

impl CompletionRequest {
    /// Plain text completion.
    #[must_use]
    pub fn text(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tool: None,
            force_tool: false,
            json_response: false,
        }
    }

    /// Completion that must invoke the given tool.
    #[must_use]
    pub fn forced_tool(
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
        tool: ToolSpec,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            tool: Some(tool),
            force_tool: true,
            json_response: false,
        }
    }

    /// Completion whose answer must be a JSON object.
    #[must_use]
    pub fn json(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            tool: None,
            force_tool: false,
            json_response: true,
        }
    }
}

/// A tool call the model made.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolInvocation {
    /// Name of the invoked tool.
    pub name: String,
    /// Arguments exactly as the model produced them.
    pub arguments: String,
}

/// One completion response.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompletionResponse {
    /// Tool call, when the model invoked one.
    pub tool_call: Option<ToolInvocation>,
    /// Plain text content, when the model answered in prose.
    pub text: Option<String>,
}

/// A chat-completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion.
    async fn complete(&self, request: CompletionRequest) -> BackendResult<CompletionResponse>;
}
