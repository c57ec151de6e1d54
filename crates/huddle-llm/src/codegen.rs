//! Generation client: turn a conversation into one candidate query plan.

use std::sync::Arc;

use tracing::{debug, instrument};

use huddle_core::{CandidateProgram, ConversationTurn, ExecFailure, ModelTier, Role};
use huddle_schema::SchemaReference;

use crate::backend::{ChatMessage, CompletionRequest, LanguageModel};
use crate::prompts::{QUERY_PLAN_TOOL, codegen_tool, retry_prompt, system_prompt};

/// Errors from a generation attempt.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] crate::backend::BackendError),

    /// The model answered without the required tool call.
    #[error("model produced no query plan{}", text.as_deref().map(|t| format!("; said: {t}")).unwrap_or_default())]
    NoStructuredOutput {
        /// Prose the model returned instead, if any.
        text: Option<String>,
    },
}

/// The most recent failure, fed to the next attempt.
///
/// Only the last failure is carried; earlier ones are discarded.
#[derive(Clone, Debug)]
pub struct PriorFeedback {
    /// The plan text that failed, if generation got that far.
    pub failed_plan: Option<String>,
    /// The structured failure it produced.
    pub failure: ExecFailure,
}

/// Produces candidate query plans from conversations.
pub struct CodegenClient {
    backend: Arc<dyn LanguageModel>,
    schema: Arc<SchemaReference>,
    current_season: i64,
}

impl CodegenClient {
    /// Build a generation client.
    #[must_use]
    pub fn new(
        backend: Arc<dyn LanguageModel>,
        schema: Arc<SchemaReference>,
        current_season: i64,
    ) -> Self {
        Self {
            backend,
            schema,
            current_season,
        }
    }

    /// Generate one candidate plan.
    ///
    /// The prompt is the system message, the conversation turns in order,
    /// and (when retrying) a single feedback message describing the most
    /// recent failure.
    ///
    /// # Errors
    ///
    /// Fails when the backend errors or the model does not call the
    /// generation tool.
    #[instrument(skip_all, fields(model, attempt = attempt_index, tier = tier.as_str()))]
    pub async fn generate(
        &self,
        model: &str,
        conversation: &[ConversationTurn],
        feedback: Option<&PriorFeedback>,
        attempt_index: u32,
        tier: ModelTier,
    ) -> Result<CandidateProgram, GenerationError> {
        let mut messages =
            vec![ChatMessage::system(system_prompt(&self.schema, self.current_season))];
        for turn in conversation {
            messages.push(match turn.role {
                Role::User => ChatMessage::user(&turn.content),
                Role::Assistant => ChatMessage::assistant(&turn.content),
            });
        }
        if let Some(feedback) = feedback {
            messages.push(ChatMessage::user(retry_prompt(
                feedback.failed_plan.as_deref(),
                &feedback.failure,
            )));
        }

        let request = CompletionRequest::forced_tool(model, messages, codegen_tool());
        let response = self.backend.complete(request).await?;

        match response.tool_call {
            Some(call) if call.name == QUERY_PLAN_TOOL => {
                debug!(bytes = call.arguments.len(), "candidate generated");
                Ok(CandidateProgram {
                    source: call.arguments,
                    attempt_index,
                    tier,
                })
            }
            _ => Err(GenerationError::NoStructuredOutput {
                text: response.text,
            }),
        }
    }
}
