//! Candidate programs, execution outcomes, and the sandbox error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which model configuration generated a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// The default (cheaper) model, tried first.
    Primary,
    /// The escalation model, used once the primary budget is exhausted.
    Fallback,
}

impl ModelTier {
    /// Tier label for logging and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// One model-authored attempt at a query plan for the current question.
///
/// Owned by the retry controller for the duration of a single attempt and
/// discarded afterwards; only the failure it produced survives, as feedback
/// for the next candidate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateProgram {
    /// The plan text exactly as the model produced it. The generation
    /// client does not validate this; contract enforcement is the
    /// sandbox's job.
    pub source: String,
    /// Global 1-based attempt index within one pipeline run.
    pub attempt_index: u32,
    /// Which model tier authored this candidate.
    pub tier: ModelTier,
}

/// Classification of an attempt failure.
///
/// The raw error message is preserved verbatim alongside the kind; it is
/// the primary signal the next generation attempt uses to self-correct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecErrorKind {
    /// The model failed to produce a candidate at all (backend error, or
    /// no structured output).
    GenerationError,
    /// The plan referenced a column absent from the dataset's schema.
    ColumnNotFound,
    /// The plan's output violated the mapping/serializability contract.
    TypeContractViolation,
    /// Execution exceeded the wall-clock budget.
    Timeout,
    /// The plan failed during interpretation (parse error, type mismatch,
    /// invalid aggregate, ...).
    RuntimeError,
    /// A uniqueness constraint matched several distinct entities
    /// (e.g. two players sharing a name).
    UnknownColumnSemantics,
}

impl ExecErrorKind {
    /// Category string for logging and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenerationError => "generation_error",
            Self::ColumnNotFound => "column_not_found",
            Self::TypeContractViolation => "type_contract_violation",
            Self::Timeout => "timeout",
            Self::RuntimeError => "runtime_error",
            Self::UnknownColumnSemantics => "unknown_column_semantics",
        }
    }

    /// Fixed common-fix hints folded into the retry prompt for this kind.
    #[must_use]
    pub fn fix_hints(self) -> &'static [&'static str] {
        match self {
            Self::GenerationError => &[
                "Respond by calling the run_query_plan tool with a complete JSON plan; never answer in prose.",
            ],
            Self::ColumnNotFound => &[
                "Use only column names listed in the schema reference for the dataset you query.",
                "Stat columns are prefixed with their category, e.g. rushing_yards, not rush_yards.",
            ],
            Self::TypeContractViolation => &[
                "Reduce the data to a plain mapping: pick output shape \"records\" or \"scalar\", never \"table\".",
                "Aggregates over zero rows produce non-finite numbers; filter first or use count.",
            ],
            Self::Timeout => &[
                "Narrow the query: add filters or a smaller limit so it completes within the time budget.",
            ],
            Self::RuntimeError => &[
                "Compare columns against values of the matching type (numbers with numbers, strings with strings).",
                "A scalar output requires an aggregate without group_by.",
            ],
            Self::UnknownColumnSemantics => &[
                "The filters matched more than one entity; add a discriminating filter such as team or position.",
            ],
        }
    }
}

impl std::fmt::Display for ExecErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured sandbox failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct ExecFailure {
    /// Failure classification.
    pub kind: ExecErrorKind,
    /// Raw error text, preserved verbatim for retry feedback.
    pub message: String,
}

impl ExecFailure {
    /// Build a failure of the given kind.
    pub fn new(kind: ExecErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Outcome of executing one candidate program. Exactly one per attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionOutcome {
    /// The plan ran and produced a JSON object mapping.
    Success {
        /// The mapping returned by the plan's output spec.
        result: Map<String, Value>,
    },
    /// The plan failed; the failure feeds the next attempt's prompt.
    Failure(ExecFailure),
}

impl ExecutionOutcome {
    /// Whether this outcome is a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Record of one generate + execute cycle, kept for reporting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    /// Global 1-based attempt index; no two attempts in one run share it.
    pub index: u32,
    /// Which model tier ran this attempt.
    pub tier: ModelTier,
    /// The error this attempt produced, if it failed.
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tier_labels() {
        assert_eq!(ModelTier::Primary.as_str(), "primary");
        assert_eq!(ModelTier::Fallback.as_str(), "fallback");
    }

    #[test]
    fn error_kind_strings_are_distinct() {
        let kinds = [
            ExecErrorKind::GenerationError,
            ExecErrorKind::ColumnNotFound,
            ExecErrorKind::TypeContractViolation,
            ExecErrorKind::Timeout,
            ExecErrorKind::RuntimeError,
            ExecErrorKind::UnknownColumnSemantics,
        ];
        let strings: std::collections::BTreeSet<_> =
            kinds.iter().map(|k| k.as_str()).collect();
        assert_eq!(strings.len(), kinds.len());
    }

    #[test]
    fn every_kind_has_hints() {
        for kind in [
            ExecErrorKind::GenerationError,
            ExecErrorKind::ColumnNotFound,
            ExecErrorKind::TypeContractViolation,
            ExecErrorKind::Timeout,
            ExecErrorKind::RuntimeError,
            ExecErrorKind::UnknownColumnSemantics,
        ] {
            assert!(!kind.fix_hints().is_empty(), "{kind} has no hints");
        }
    }

    #[test]
    fn failure_display_includes_kind_and_message() {
        let f = ExecFailure::new(ExecErrorKind::ColumnNotFound, "no column rush_yards");
        assert_eq!(f.to_string(), "column_not_found: no column rush_yards");
    }

    #[test]
    fn outcome_success_flag() {
        let mut result = Map::new();
        let _ = result.insert("total".into(), json!(12));
        assert!(ExecutionOutcome::Success { result }.is_success());
        assert!(!ExecutionOutcome::Failure(ExecFailure::new(
            ExecErrorKind::Timeout,
            "took too long"
        ))
        .is_success());
    }
}
