//! The typed query-plan model.
//!
//! This is the program surface the generation model writes against:
//! pick a dataset, narrow it, optionally aggregate, shape the output.
//! `deny_unknown_fields` everywhere; an unknown field is a parse
//! failure the model must correct, not something to ignore silently.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use huddle_schema::LoaderParams;

/// Comparison operator in a row filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Substring match (strings only).
    Contains,
}

/// One row filter: `column <op> value`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Filter {
    /// Column to test.
    pub column: String,
    /// Comparison operator.
    pub op: FilterOp,
    /// Literal to compare against.
    pub value: Value,
}

/// Aggregation operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggOp {
    /// Sum of a numeric column.
    Sum,
    /// Arithmetic mean of a numeric column.
    Mean,
    /// Minimum of a numeric column.
    Min,
    /// Maximum of a numeric column.
    Max,
    /// Row count (no column needed).
    Count,
}

impl AggOp {
    /// Operator label, used for derived column names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        }
    }
}

/// Aggregation step: reduce rows to one value, or one value per group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Aggregate {
    /// Operator to apply.
    pub op: AggOp,
    /// Column to aggregate; required for everything except `count`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    /// Group rows by this column before aggregating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

/// One sort key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SortKey {
    /// Column to sort by.
    pub column: String,
    /// Sort descending instead of ascending.
    #[serde(default)]
    pub descending: bool,
}

/// Shape of the plan's output mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    /// `{key: [{column: value, ...}, ...]}`: one object per row.
    Records,
    /// `{key: value}`: a single reduced value.
    Scalar,
    /// Raw table passthrough. Always rejected by the sandbox: plans must
    /// reduce tabular data to plain structures.
    Table,
}

fn default_output_key() -> String {
    "result".to_string()
}

/// Output specification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSpec {
    /// Output shape.
    pub shape: OutputShape,
    /// Key the result is placed under in the output mapping.
    #[serde(default = "default_output_key")]
    pub key: String,
}

/// A complete model-authored query plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryPlan {
    /// Dataset loader to query.
    pub dataset: String,
    /// Loader parameters (season, ...).
    #[serde(default)]
    pub params: LoaderParams,
    /// Row filters, applied in order.
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Uniqueness constraint: after filtering, all rows must agree on
    /// this column's value. Violations fail with
    /// `UnknownColumnSemantics` so the next attempt can disambiguate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_by: Option<String>,
    /// Optional aggregation step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,
    /// Sort keys, applied after aggregation.
    #[serde(default)]
    pub sort: Vec<SortKey>,
    /// Keep at most this many rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Project these columns into the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
    /// How the final mapping is shaped.
    pub output: OutputSpec,
}

impl QueryPlan {
    /// Every column name the plan references on its source dataset.
    ///
    /// Used for up-front schema validation. Columns the aggregation step
    /// *derives* (e.g. `sum_rushing_yards`) are excluded from sort/select
    /// validation because they do not exist on the source schema.
    #[must_use]
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut cols: Vec<&str> = Vec::new();
        for f in &self.filters {
            cols.push(f.column.as_str());
        }
        if let Some(u) = &self.unique_by {
            cols.push(u.as_str());
        }
        if let Some(agg) = &self.aggregate {
            if let Some(c) = &agg.column {
                cols.push(c.as_str());
            }
            if let Some(g) = &agg.group_by {
                cols.push(g.as_str());
            }
        }
        // Sort/select columns refer to the source schema only when the
        // plan does not aggregate; after aggregation they address derived
        // columns and are checked at interpretation time instead.
        if self.aggregate.is_none() {
            for s in &self.sort {
                cols.push(s.column.as_str());
            }
            if let Some(select) = &self.select {
                for c in select {
                    cols.push(c.as_str());
                }
            }
        }
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    /// Name of the column the aggregation step derives.
    #[must_use]
    pub fn derived_column(op: AggOp, column: Option<&str>) -> String {
        match (op, column) {
            (AggOp::Count, _) => "count".to_string(),
            (op, Some(c)) => format!("{}_{c}", op.as_str()),
            (op, None) => op.as_str().to_string(),
        }
    }
}
