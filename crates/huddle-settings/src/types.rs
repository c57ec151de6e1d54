//! Settings types with compiled defaults.

use serde::{Deserialize, Serialize};

/// HTTP server settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Language-model backend settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Bearer token for the backend; `None` for keyless local gateways.
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL, without `/chat/completions`.
    pub base_url: String,
    /// Generation model for the primary tier.
    pub primary_model: String,
    /// Generation model for the escalation tier.
    pub fallback_model: String,
    /// Model used for validation and summarization.
    pub validator_model: String,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            primary_model: "gpt-5.1-mini".to_string(),
            fallback_model: "gpt-5.1".to_string(),
            validator_model: "gpt-5.1-mini".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Retry and execution budgets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Attempt budget for the primary tier.
    pub max_attempts_primary: u32,
    /// Attempt budget for the fallback tier. Zero disables escalation.
    pub max_attempts_fallback: u32,
    /// Wall-clock budget for one sandbox execution, in seconds.
    pub execution_timeout_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_attempts_primary: 3,
            max_attempts_fallback: 2,
            execution_timeout_secs: 30,
        }
    }
}

/// Top-level settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HuddleSettings {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Language-model backend settings.
    pub llm: LlmSettings,
    /// Retry and execution budgets.
    pub pipeline: PipelineSettings,
    /// The season assumed when a question names none.
    pub current_season: i64,
}

impl Default for HuddleSettings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            llm: LlmSettings::default(),
            pipeline: PipelineSettings::default(),
            current_season: 2025,
        }
    }
}
