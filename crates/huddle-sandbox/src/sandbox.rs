//! The sandbox boundary: parse, validate, interpret under a timeout.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, instrument, warn};

use huddle_core::{CandidateProgram, ExecErrorKind, ExecFailure, ExecutionOutcome};
use huddle_schema::{LoaderRegistry, SchemaReference};

use crate::interpret;
use crate::plan::QueryPlan;

/// Executes candidate query plans against the loader registry.
///
/// The sandbox never trusts the candidate text: it parses into the typed
/// plan model, validates every referenced column against the schema
/// reference before touching data, and bounds interpretation with a
/// wall-clock timeout. All failures come back as [`ExecutionOutcome::Failure`]
/// with raw messages suitable for retry feedback; `execute` itself never
/// errors.
pub struct Sandbox {
    registry: Arc<LoaderRegistry>,
    schema: Arc<SchemaReference>,
    timeout: Duration,
}

impl Sandbox {
    /// Build a sandbox over a registry with the given execution budget.
    #[must_use]
    pub fn new(registry: Arc<LoaderRegistry>, timeout: Duration) -> Self {
        let schema = Arc::new(registry.schema_reference());
        Self {
            registry,
            schema,
            timeout,
        }
    }

    /// The schema reference derived from the registry.
    #[must_use]
    pub fn schema(&self) -> Arc<SchemaReference> {
        Arc::clone(&self.schema)
    }

    /// Execute one candidate program.
    #[instrument(skip_all, fields(attempt = candidate.attempt_index, tier = candidate.tier.as_str()))]
    pub async fn execute(&self, candidate: &CandidateProgram) -> ExecutionOutcome {
        let plan: QueryPlan = match serde_json::from_str(&candidate.source) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "candidate failed to parse");
                return ExecutionOutcome::Failure(ExecFailure::new(
                    ExecErrorKind::RuntimeError,
                    format!("query plan failed to parse: {e}"),
                ));
            }
        };

        if let Err(failure) = self.validate_columns(&plan) {
            warn!(kind = failure.kind.as_str(), "candidate failed validation");
            return ExecutionOutcome::Failure(failure);
        }

        let Some(loader) = self.registry.get(&plan.dataset) else {
            let available: Vec<&str> = self.registry.names().collect();
            return ExecutionOutcome::Failure(ExecFailure::new(
                ExecErrorKind::RuntimeError,
                format!(
                    "unknown dataset \"{}\"; available datasets: {}",
                    plan.dataset,
                    available.join(", ")
                ),
            ));
        };

        // Interpretation is synchronous and loader-bound; run it off the
        // async workers and bound it with the wall-clock budget.
        let handle =
            tokio::task::spawn_blocking(move || interpret::evaluate(&plan, loader.as_ref()));

        match tokio::time::timeout(self.timeout, handle).await {
            Ok(Ok(Ok(result))) => {
                debug!(keys = result.len(), "candidate executed");
                ExecutionOutcome::Success { result }
            }
            Ok(Ok(Err(failure))) => {
                debug!(kind = failure.kind.as_str(), "candidate failed");
                ExecutionOutcome::Failure(failure)
            }
            Ok(Err(join_err)) => ExecutionOutcome::Failure(ExecFailure::new(
                ExecErrorKind::RuntimeError,
                format!("execution task failed: {join_err}"),
            )),
            Err(_) => {
                warn!(budget_ms = self.timeout.as_millis(), "candidate timed out");
                ExecutionOutcome::Failure(ExecFailure::new(
                    ExecErrorKind::Timeout,
                    format!(
                        "execution exceeded the {}s time budget",
                        self.timeout.as_secs_f64()
                    ),
                ))
            }
        }
    }

    /// Check every referenced column against the dataset's declared schema.
    ///
    /// The failure message carries the offending column name verbatim; the
    /// retry prompt depends on that.
    fn validate_columns(&self, plan: &QueryPlan) -> Result<(), ExecFailure> {
        let Some(schema) = self.schema.get(&plan.dataset) else {
            // Unknown dataset is reported by the registry lookup with the
            // list of alternatives.
            return Ok(());
        };
        for column in plan.referenced_columns() {
            if !schema.columns.contains(column) {
                return Err(ExecFailure::new(
                    ExecErrorKind::ColumnNotFound,
                    format!(
                        "column \"{column}\" does not exist on dataset \"{}\"; available columns: {}",
                        plan.dataset,
                        schema
                            .columns
                            .iter()
                            .map(String::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// A plan literal as candidate source, for tests and demos.
#[must_use]
pub fn candidate_from_plan(plan: &Value, attempt_index: u32) -> CandidateProgram {
    CandidateProgram {
        source: plan.to_string(),
        attempt_index,
        tier: huddle_core::ModelTier::Primary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use huddle_schema::sample::{PlayerStatsLoader, TeamStatsLoader};
    use huddle_schema::{DatasetLoader, LoaderError, LoaderParams, ParamSpec, Table};
    use serde_json::json;

    fn sandbox() -> Sandbox {
        let mut registry = LoaderRegistry::new();
        registry.register(Arc::new(PlayerStatsLoader::with_sample_data()));
        registry.register(Arc::new(TeamStatsLoader::with_sample_data()));
        Sandbox::new(Arc::new(registry), Duration::from_secs(5))
    }

    async fn run(sandbox: &Sandbox, plan: serde_json::Value) -> ExecutionOutcome {
        sandbox.execute(&candidate_from_plan(&plan, 1)).await
    }

    #[tokio::test]
    async fn executes_a_valid_plan() {
        let outcome = run(
            &sandbox(),
            json!({
                "dataset": "player_stats",
                "params": {"season": 2025},
                "filters": [{"column": "position", "op": "eq", "value": "RB"}],
                "sort": [{"column": "rushing_yards", "descending": true}],
                "limit": 5,
                "select": ["player_name", "rushing_yards"],
                "output": {"shape": "records", "key": "top_rushers"}
            }),
        )
        .await;

        let ExecutionOutcome::Success { result } = outcome else {
            panic!("expected success, got {outcome:?}");
        };
        assert_eq!(result["top_rushers"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn unknown_column_is_reported_verbatim() {
        let outcome = run(
            &sandbox(),
            json!({
                "dataset": "player_stats",
                "filters": [{"column": "rush_yards", "op": "gt", "value": 1000}],
                "output": {"shape": "records"}
            }),
        )
        .await;

        let ExecutionOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, ExecErrorKind::ColumnNotFound);
        assert!(failure.message.contains("rush_yards"));
        assert!(failure.message.contains("player_stats"));
    }

    #[tokio::test]
    async fn unparsable_source_is_a_runtime_error() {
        let candidate = CandidateProgram {
            source: "SELECT * FROM player_stats".to_string(),
            attempt_index: 1,
            tier: huddle_core::ModelTier::Primary,
        };
        let outcome = sandbox().execute(&candidate).await;
        assert_matches!(
            outcome,
            ExecutionOutcome::Failure(ExecFailure {
                kind: ExecErrorKind::RuntimeError,
                ..
            })
        );
    }

    #[tokio::test]
    async fn unknown_dataset_lists_alternatives() {
        let outcome = run(
            &sandbox(),
            json!({"dataset": "play_by_play", "output": {"shape": "records"}}),
        )
        .await;
        let ExecutionOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, ExecErrorKind::RuntimeError);
        assert!(failure.message.contains("play_by_play"));
        assert!(failure.message.contains("player_stats"));
        assert!(failure.message.contains("team_stats"));
    }

    #[tokio::test]
    async fn table_shape_violates_the_contract() {
        let outcome = run(
            &sandbox(),
            json!({"dataset": "team_stats", "output": {"shape": "table"}}),
        )
        .await;
        assert_matches!(
            outcome,
            ExecutionOutcome::Failure(ExecFailure {
                kind: ExecErrorKind::TypeContractViolation,
                ..
            })
        );
    }

    #[tokio::test]
    async fn ambiguous_entity_is_unknown_column_semantics() {
        let outcome = run(
            &sandbox(),
            json!({
                "dataset": "player_stats",
                "params": {"season": 2025},
                "filters": [{"column": "player_name", "op": "eq", "value": "Jordan Banks"}],
                "unique_by": "player_id",
                "output": {"shape": "records", "key": "player"}
            }),
        )
        .await;
        assert_matches!(
            outcome,
            ExecutionOutcome::Failure(ExecFailure {
                kind: ExecErrorKind::UnknownColumnSemantics,
                ..
            })
        );
    }

    struct SlowLoader;

    impl DatasetLoader for SlowLoader {
        fn name(&self) -> &str {
            "slow_stats"
        }
        fn description(&self) -> &str {
            "loader that never finishes in time"
        }
        fn parameters(&self) -> Vec<ParamSpec> {
            Vec::new()
        }
        fn columns(&self) -> Vec<String> {
            vec!["value".to_string()]
        }
        fn load(&self, _params: &LoaderParams) -> Result<Table, LoaderError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(Table::new(self.columns()))
        }
    }

    #[tokio::test]
    async fn slow_execution_times_out() {
        let mut registry = LoaderRegistry::new();
        registry.register(Arc::new(SlowLoader));
        let sandbox = Sandbox::new(Arc::new(registry), Duration::from_millis(20));

        let outcome = run(
            &sandbox,
            json!({"dataset": "slow_stats", "output": {"shape": "records"}}),
        )
        .await;
        assert_matches!(
            outcome,
            ExecutionOutcome::Failure(ExecFailure {
                kind: ExecErrorKind::Timeout,
                ..
            })
        );
    }

    #[tokio::test]
    async fn loader_param_rejection_is_a_runtime_error() {
        let outcome = run(
            &sandbox(),
            json!({
                "dataset": "player_stats",
                "params": {"season": 2025, "week": 3},
                "output": {"shape": "records"}
            }),
        )
        .await;
        let ExecutionOutcome::Failure(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.kind, ExecErrorKind::RuntimeError);
        assert!(failure.message.contains("week"));
    }
}
