//! Prompt construction.
//!
//! All model-facing text lives here: the generation system prompt (with
//! the rendered schema reference), the retry feedback block, and the
//! validation/summarization instructions.

use std::fmt::Write as _;

use serde_json::{Value, json};

use huddle_core::ExecFailure;
use huddle_schema::SchemaReference;

use crate::backend::ToolSpec;

/// Name of the forced generation tool.
pub const QUERY_PLAN_TOOL: &str = "run_query_plan";

/// Generation system prompt. `{{schema}}` and `{{current_season}}` are
/// substituted by [`system_prompt`].
const SYSTEM_PROMPT_TEMPLATE: &str = "\
You are a football statistics analyst. You answer questions by writing a \
single JSON query plan and calling the run_query_plan tool with it. Never \
answer in prose; always call the tool.

The current season is {{current_season}}. When the question does not name a \
season, query the current one.

A query plan selects one dataset, optionally filters rows, optionally \
aggregates, then shapes the output:
- dataset: which dataset to query (see the schema reference below)
- params: loader parameters, e.g. {\"season\": {{current_season}}}
- filters: [{\"column\", \"op\" (eq|ne|gt|gte|lt|lte|contains), \"value\"}]
- unique_by: assert all matching rows agree on this column; use it with a \
player_id when a question names a single player, so ambiguous names fail \
loudly instead of mixing players
- aggregate: {\"op\" (sum|mean|min|max|count), \"column\", \"group_by\"}; \
grouping derives a column named <op>_<column>
- sort: [{\"column\", \"descending\"}], applied after aggregation
- limit, select: trim rows and columns
- output: {\"shape\": \"records\" or \"scalar\", \"key\"}; never \"table\" \
(raw tables are rejected)

Use only column names from the schema reference. The output must be a plain \
JSON mapping.

Schema reference:
{{schema}}
";

/// Validation system prompt: judge and summarize in one JSON object.
pub const VALIDATION_PROMPT: &str = "\
You are reviewing the result of a statistics query. Given the user's \
question and the raw query result, decide whether the result plausibly \
answers the question, then write a concise natural-language answer grounded \
only in the data shown. Respond with a JSON object: \
{\"is_valid\": boolean, \"summary\": string}. If the result does not answer \
the question, set is_valid to false and explain the mismatch in summary.";

/// Render the schema reference as prompt text.
#[must_use]
pub fn render_schema(schema: &SchemaReference) -> String {
    let mut out = String::new();
    for (name, loader) in schema.iter() {
        let _ = writeln!(out, "- {name}: {}", loader.description);
        for param in &loader.parameters {
            let _ = writeln!(out, "  param {}: {}", param.name, param.description);
        }
        let columns: Vec<&str> = loader.columns.iter().map(String::as_str).collect();
        let _ = writeln!(out, "  columns: {}", columns.join(", "));
    }
    out
}

/// The full generation system prompt for the given schema and season.
#[must_use]
pub fn system_prompt(schema: &SchemaReference, current_season: i64) -> String {
    SYSTEM_PROMPT_TEMPLATE
        .replace("{{current_season}}", &current_season.to_string())
        .replace("{{schema}}", &render_schema(schema))
}

/// Retry feedback appended after a failed attempt.
///
/// Carries the failed plan, the raw error verbatim, and the fixed hints
/// for the error's kind. Only the most recent failure is ever included.
#[must_use]
pub fn retry_prompt(failed_plan: Option<&str>, failure: &ExecFailure) -> String {
    let mut out = String::from("Your previous query plan failed.\n");
    if let Some(plan) = failed_plan {
        let _ = writeln!(out, "Plan:\n{plan}");
    }
    let _ = writeln!(out, "Error ({}): {}", failure.kind.as_str(), failure.message);
    let _ = writeln!(out, "Common fixes:");
    for hint in failure.kind.fix_hints() {
        let _ = writeln!(out, "- {hint}");
    }
    out.push_str("Write a corrected plan and call run_query_plan again.");
    out
}

/// User prompt for the validation/summarization call.
#[must_use]
pub fn validation_user_prompt(question: &str, raw_result: &Value) -> String {
    format!("Question: {question}\n\nQuery result:\n{raw_result}")
}

/// The forced generation tool, with the plan's JSON Schema.
#[must_use]
pub fn codegen_tool() -> ToolSpec {
    ToolSpec {
        name: QUERY_PLAN_TOOL.to_string(),
        description: "Execute a JSON query plan against the statistics datasets".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "dataset": {"type": "string"},
                "params": {
                    "type": "object",
                    "properties": {
                        "season": {"type": "integer"},
                        "week": {"type": "integer"}
                    },
                    "additionalProperties": false
                },
                "filters": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "column": {"type": "string"},
                            "op": {"enum": ["eq", "ne", "gt", "gte", "lt", "lte", "contains"]},
                            "value": {}
                        },
                        "required": ["column", "op", "value"],
                        "additionalProperties": false
                    }
                },
                "unique_by": {"type": "string"},
                "aggregate": {
                    "type": "object",
                    "properties": {
                        "op": {"enum": ["sum", "mean", "min", "max", "count"]},
                        "column": {"type": "string"},
                        "group_by": {"type": "string"}
                    },
                    "required": ["op"],
                    "additionalProperties": false
                },
                "sort": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "column": {"type": "string"},
                            "descending": {"type": "boolean"}
                        },
                        "required": ["column"],
                        "additionalProperties": false
                    }
                },
                "limit": {"type": "integer", "minimum": 1},
                "select": {"type": "array", "items": {"type": "string"}},
                "output": {
                    "type": "object",
                    "properties": {
                        "shape": {"enum": ["records", "scalar"]},
                        "key": {"type": "string"}
                    },
                    "required": ["shape"],
                    "additionalProperties": false
                }
            },
            "required": ["dataset", "output"],
            "additionalProperties": false
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_core::ExecErrorKind;
    use huddle_schema::sample::PlayerStatsLoader;
    use huddle_schema::LoaderRegistry;
    use std::sync::Arc;

    fn schema() -> SchemaReference {
        let mut registry = LoaderRegistry::new();
        registry.register(Arc::new(PlayerStatsLoader::with_sample_data()));
        registry.schema_reference()
    }

    #[test]
    fn system_prompt_embeds_schema_and_season() {
        let prompt = system_prompt(&schema(), 2025);
        assert!(prompt.contains("current season is 2025"));
        assert!(prompt.contains("player_stats"));
        assert!(prompt.contains("rushing_yards"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn retry_prompt_carries_raw_error_and_hints() {
        let failure = ExecFailure::new(
            ExecErrorKind::ColumnNotFound,
            "column \"rush_yards\" does not exist on dataset \"player_stats\"",
        );
        let prompt = retry_prompt(Some("{\"dataset\":\"player_stats\"}"), &failure);
        assert!(prompt.contains("rush_yards"));
        assert!(prompt.contains("column_not_found"));
        assert!(prompt.contains("rushing_yards, not rush_yards"));
        assert!(prompt.contains("call run_query_plan again"));
    }

    #[test]
    fn codegen_tool_schema_rejects_table_shape() {
        let tool = codegen_tool();
        assert_eq!(tool.name, QUERY_PLAN_TOOL);
        let shapes = tool.parameters["properties"]["output"]["properties"]["shape"]["enum"]
            .as_array()
            .unwrap();
        assert!(!shapes.iter().any(|s| s == "table"));
    }
}
