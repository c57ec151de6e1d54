//! OpenAI-compatible chat-completions client.
//!
//! Speaks the `/chat/completions` wire format against a configurable base
//! URL, so any compatible gateway works. Tool calls are requested with a
//! forced `tool_choice`; JSON answers with `response_format: json_object`.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use async_trait::async_trait;

use crate::backend::{
    BackendError, BackendResult, ChatMessage, CompletionRequest, CompletionResponse,
    LanguageModel, ToolInvocation,
};

/// Configuration for the OpenAI-compatible backend.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    /// API base URL, without the trailing `/chat/completions`.
    pub base_url: String,
    /// Bearer token; omitted entirely when `None` (local gateways).
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub request_timeout: std::time::Duration,
}

/// HTTP client implementing [`LanguageModel`] over the chat-completions API.
pub struct OpenAiBackend {
    client: reqwest::Client,
    config: OpenAiConfig,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct WireError {
    error: WireErrorBody,
}

#[derive(Deserialize)]
struct WireErrorBody {
    message: String,
}

impl OpenAiBackend {
    /// Build a backend from config.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Http`] if the underlying client cannot be
    /// constructed.
    pub fn new(config: OpenAiConfig) -> BackendResult<Self> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {key}"))
                .unwrap_or_else(|_| HeaderValue::from_static("Bearer invalid"));
            let _ = headers.insert(AUTHORIZATION, value);
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl LanguageModel for OpenAiBackend {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> BackendResult<CompletionResponse> {
        let tools = request.tool.as_ref().map(|tool| {
            vec![json!({
                "type": "function",
                "function": {
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters,
                },
            })]
        });
        let tool_choice = request.tool.as_ref().filter(|_| request.force_tool).map(
            |tool| json!({"type": "function", "function": {"name": tool.name}}),
        );
        let response_format = request
            .json_response
            .then(|| json!({"type": "json_object"}));

        let body = WireRequest {
            model: &request.model,
            messages: &request.messages,
            tools,
            tool_choice,
            response_format,
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<WireError>(&text)
                .map_or(text, |e| e.error.message);
            warn!(status = status.as_u16(), "backend returned an error");
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: WireResponse = response.json().await?;
        let Some(choice) = parsed.choices.into_iter().next() else {
            return Err(BackendError::EmptyCompletion);
        };

        let tool_call = choice
            .message
            .tool_calls
            .into_iter()
            .next()
            .map(|call| ToolInvocation {
                name: call.function.name,
                arguments: call.function.arguments,
            });
        let text = choice.message.content.filter(|c| !c.is_empty());

        if tool_call.is_none() && text.is_none() {
            return Err(BackendError::EmptyCompletion);
        }

        debug!(has_tool_call = tool_call.is_some(), "completion received");
        Ok(CompletionResponse { tool_call, text })
    }
}
