//! Terminal pipeline artifacts: the validation verdict and the result
//! payload carried by the terminal wire frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The validator's plausibility judgment plus final answer text.
///
/// Produced at most once per question, from the first successful execution
/// outcome only. `is_valid = false` is not an error; it is a successful
/// pipeline outcome carrying a negative judgment, surfaced verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// Whether the raw result plausibly answers the question.
    pub is_valid: bool,
    /// Natural-language answer (when valid) or an explanation of why the
    /// data looks wrong (when not).
    pub summary: String,
}

/// Terminal artifact of one pipeline run; immutable once constructed.
///
/// Field names are the wire contract; this struct serializes directly
/// into the `data` payload of the terminal `complete`/`error` frame and
/// into the non-streaming response body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Natural-language response to the question.
    pub response: String,
    /// The last candidate's plan source, if any candidate was generated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_generated: Option<String>,
    /// Raw data from the successful execution, or `None` on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<Value>,
    /// Number of candidate programs generated; never zero on a terminal
    /// result.
    pub attempts: u32,
    /// Whether any attempt used the fallback model. Informational, not an
    /// error signal.
    #[serde(default)]
    pub used_fallback: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_wire_shape_success() {
        let result = PipelineResult {
            response: "Top rusher: J. Example with 1,402 yards.".into(),
            code_generated: Some("{\"dataset\":\"player_stats\"}".into()),
            raw_data: Some(json!({"top_rushers": []})),
            attempts: 2,
            used_fallback: false,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["response"], "Top rusher: J. Example with 1,402 yards.");
        assert_eq!(value["attempts"], 2);
        assert_eq!(value["used_fallback"], false);
        assert!(value.get("raw_data").is_some());
    }

    #[test]
    fn result_wire_shape_failure_omits_nulls() {
        let result = PipelineResult {
            response: "Failed to produce a working query plan".into(),
            code_generated: None,
            raw_data: None,
            attempts: 5,
            used_fallback: true,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("code_generated").is_none());
        assert!(value.get("raw_data").is_none());
        assert_eq!(value["used_fallback"], true);
    }

    #[test]
    fn verdict_roundtrip() {
        let verdict = ValidationVerdict {
            is_valid: false,
            summary: "The data is empty and cannot answer the question.".into(),
        };
        let json = serde_json::to_string(&verdict).unwrap();
        let back: ValidationVerdict = serde_json::from_str(&json).unwrap();
        assert_eq!(back, verdict);
    }

    #[test]
    fn verdict_parses_model_output() {
        let verdict: ValidationVerdict =
            serde_json::from_str(r#"{"is_valid":true,"summary":"Looks right."}"#).unwrap();
        assert!(verdict.is_valid);
    }
}
