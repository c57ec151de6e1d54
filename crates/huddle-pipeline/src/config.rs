//! Pipeline configuration.

use serde::{Deserialize, Serialize};

fn default_max_attempts_primary() -> u32 {
    3
}

fn default_max_attempts_fallback() -> u32 {
    2
}

fn default_primary_model() -> String {
    "gpt-5.1-mini".to_string()
}

fn default_fallback_model() -> String {
    "gpt-5.1".to_string()
}

/// Retry budgets and model tiers for one pipeline instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Generation model for the primary tier.
    pub primary_model: String,
    /// Generation model for the escalation tier.
    pub fallback_model: String,
    /// Attempt budget for the primary tier.
    pub max_attempts_primary: u32,
    /// Attempt budget for the fallback tier. Zero disables escalation.
    pub max_attempts_fallback: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
            max_attempts_primary: default_max_attempts_primary(),
            max_attempts_fallback: default_max_attempts_fallback(),
        }
    }
}

impl PipelineConfig {
    /// Total candidate budget across both tiers.
    #[must_use]
    pub fn total_budget(&self) -> u32 {
        self.max_attempts_primary + self.max_attempts_fallback
    }
}
