//! Validation and summarization of successful results.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use huddle_core::ValidationVerdict;

use crate::backend::{BackendError, ChatMessage, CompletionRequest, LanguageModel};
use crate::prompts::{VALIDATION_PROMPT, validation_user_prompt};

/// Errors from a validation call.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The model's answer was not the expected JSON object.
    #[error("validator returned an unparsable verdict: {text}")]
    UnparsableVerdict {
        /// What the model actually said.
        text: String,
    },
}

/// Judges raw query results against the question and writes the answer.
pub struct Validator {
    backend: Arc<dyn LanguageModel>,
    model: String,
}

impl Validator {
    /// Build a validator using the given model.
    #[must_use]
    pub fn new(backend: Arc<dyn LanguageModel>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    /// Validate a raw result against the user's question.
    ///
    /// # Errors
    ///
    /// Fails when the backend errors or the verdict cannot be parsed. The
    /// caller decides whether to degrade to an unvalidated answer.
    #[instrument(skip_all)]
    pub async fn validate(
        &self,
        question: &str,
        raw_result: &Value,
    ) -> Result<ValidationVerdict, ValidationError> {
        let messages = vec![
            ChatMessage::system(VALIDATION_PROMPT),
            ChatMessage::user(validation_user_prompt(question, raw_result)),
        ];
        let response = self
            .backend
            .complete(CompletionRequest::json(&self.model, messages))
            .await?;

        let text = response.text.unwrap_or_default();
        let verdict: ValidationVerdict = serde_json::from_str(&text)
            .map_err(|_| ValidationError::UnparsableVerdict { text: text.clone() })?;
        debug!(is_valid = verdict.is_valid, "verdict received");
        Ok(verdict)
    }
}
