//! Query-plan interpreter.
//!
//! Pure, synchronous evaluation of a parsed [`QueryPlan`] against one
//! dataset loader. Every failure is a structured [`ExecFailure`]; the
//! message text is preserved verbatim for retry feedback, so it names the
//! offending column/value wherever possible.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use huddle_core::{ExecErrorKind, ExecFailure};
use huddle_schema::{DatasetLoader, Table};

use crate::plan::{AggOp, Aggregate, Filter, FilterOp, OutputShape, OutputSpec, QueryPlan, SortKey};

type ExecResult<T> = Result<T, ExecFailure>;

/// Evaluate a plan against its loader, producing the output mapping.
pub fn evaluate(plan: &QueryPlan, loader: &dyn DatasetLoader) -> ExecResult<Map<String, Value>> {
    let table = loader.load(&plan.params).map_err(|e| {
        ExecFailure::new(
            ExecErrorKind::RuntimeError,
            format!("dataset \"{}\" failed to load: {e}", plan.dataset),
        )
    })?;

    let table = apply_filters(table, &plan.filters)?;

    if let Some(column) = &plan.unique_by {
        check_unique(&table, column)?;
    }

    let mut table = match &plan.aggregate {
        Some(agg) => aggregate(&table, agg)?,
        None => table,
    };

    sort_rows(&mut table, &plan.sort)?;

    if let Some(limit) = plan.limit {
        table.rows.truncate(limit);
    }

    let table = match &plan.select {
        Some(columns) => project(table, columns)?,
        None => table,
    };

    build_output(table, &plan.output)
}

fn column_index(table: &Table, column: &str) -> ExecResult<usize> {
    table.column_index(column).ok_or_else(|| {
        ExecFailure::new(
            ExecErrorKind::ColumnNotFound,
            format!(
                "column \"{column}\" does not exist; available columns: {}",
                table.columns.join(", ")
            ),
        )
    })
}

fn apply_filters(mut table: Table, filters: &[Filter]) -> ExecResult<Table> {
    for filter in filters {
        let idx = column_index(&table, &filter.column)?;
        let mut kept = Vec::with_capacity(table.rows.len());
        for row in table.rows {
            if matches_filter(&row[idx], filter)? {
                kept.push(row);
            }
        }
        table.rows = kept;
    }
    Ok(table)
}

fn matches_filter(cell: &Value, filter: &Filter) -> ExecResult<bool> {
    let type_mismatch = || {
        ExecFailure::new(
            ExecErrorKind::RuntimeError,
            format!(
                "filter on column \"{}\" compares {cell} against {}; operand types must match",
                filter.column, filter.value
            ),
        )
    };

    match (cell, &filter.value) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (
                a.as_f64().ok_or_else(type_mismatch)?,
                b.as_f64().ok_or_else(type_mismatch)?,
            );
            match filter.op {
                FilterOp::Eq => Ok((a - b).abs() < f64::EPSILON),
                FilterOp::Ne => Ok((a - b).abs() >= f64::EPSILON),
                FilterOp::Gt => Ok(a > b),
                FilterOp::Gte => Ok(a >= b),
                FilterOp::Lt => Ok(a < b),
                FilterOp::Lte => Ok(a <= b),
                FilterOp::Contains => Err(ExecFailure::new(
                    ExecErrorKind::RuntimeError,
                    format!(
                        "filter op \"contains\" requires strings; column \"{}\" is numeric",
                        filter.column
                    ),
                )),
            }
        }
        (Value::String(a), Value::String(b)) => Ok(match filter.op {
            FilterOp::Eq => a == b,
            FilterOp::Ne => a != b,
            FilterOp::Gt => a > b,
            FilterOp::Gte => a >= b,
            FilterOp::Lt => a < b,
            FilterOp::Lte => a <= b,
            FilterOp::Contains => a.to_lowercase().contains(&b.to_lowercase()),
        }),
        (Value::Bool(a), Value::Bool(b)) => match filter.op {
            FilterOp::Eq => Ok(a == b),
            FilterOp::Ne => Ok(a != b),
            _ => Err(type_mismatch()),
        },
        (Value::Null, _) | (_, Value::Null) => match filter.op {
            FilterOp::Eq => Ok(cell == &filter.value),
            FilterOp::Ne => Ok(cell != &filter.value),
            _ => Err(type_mismatch()),
        },
        _ => Err(type_mismatch()),
    }
}

fn check_unique(table: &Table, column: &str) -> ExecResult<()> {
    let idx = column_index(table, column)?;
    let mut distinct: Vec<String> = Vec::new();
    for row in &table.rows {
        let repr = row[idx].to_string();
        if !distinct.contains(&repr) {
            distinct.push(repr);
        }
    }
    if distinct.len() > 1 {
        return Err(ExecFailure::new(
            ExecErrorKind::UnknownColumnSemantics,
            format!(
                "filters match {} distinct values of \"{column}\" ({}); the identifier is \
                 ambiguous, add a discriminating filter",
                distinct.len(),
                distinct.join(", ")
            ),
        ));
    }
    Ok(())
}

/// Wrap a computed float, rejecting non-finite values.
///
/// `serde_json::Number` cannot represent NaN or infinity, so this is the
/// single funnel that upholds the JSON-serializability post-condition.
fn num_value(value: f64) -> ExecResult<Value> {
    Number::from_f64(value).map(Value::Number).ok_or_else(|| {
        ExecFailure::new(
            ExecErrorKind::TypeContractViolation,
            format!("computation produced a non-finite number ({value}); the result is not JSON-serializable"),
        )
    })
}

fn numeric_cell(cell: &Value, column: &str, op: AggOp) -> ExecResult<f64> {
    cell.as_f64().ok_or_else(|| {
        ExecFailure::new(
            ExecErrorKind::RuntimeError,
            format!(
                "aggregate \"{}\" requires a numeric column; \"{column}\" holds {cell}",
                op.as_str()
            ),
        )
    })
}

fn finalize(op: AggOp, values: &[f64]) -> ExecResult<Value> {
    match op {
        AggOp::Count => Ok(Value::Number(Number::from(values.len()))),
        AggOp::Sum => num_value(values.iter().sum()),
        #[allow(clippy::cast_precision_loss)]
        AggOp::Mean => num_value(values.iter().sum::<f64>() / values.len() as f64),
        AggOp::Min | AggOp::Max => {
            let mut iter = values.iter().copied();
            let first = iter.next().ok_or_else(|| {
                ExecFailure::new(
                    ExecErrorKind::RuntimeError,
                    format!("aggregate \"{}\" over zero rows has no value", op.as_str()),
                )
            })?;
            let folded = iter.fold(first, |acc, v| {
                if op == AggOp::Min { acc.min(v) } else { acc.max(v) }
            });
            num_value(folded)
        }
    }
}

fn aggregate(table: &Table, agg: &Aggregate) -> ExecResult<Table> {
    if agg.op != AggOp::Count && agg.column.is_none() {
        return Err(ExecFailure::new(
            ExecErrorKind::RuntimeError,
            format!("aggregate \"{}\" requires a column", agg.op.as_str()),
        ));
    }
    let value_idx = match &agg.column {
        Some(c) => Some(column_index(table, c)?),
        None => None,
    };
    let derived = QueryPlan::derived_column(agg.op, agg.column.as_deref());

    if let Some(group_col) = &agg.group_by {
        let group_idx = column_index(table, group_col)?;
        // Keyed by serialized value so heterogeneous keys still group
        // deterministically; output is sorted by key.
        let mut groups: BTreeMap<String, (Value, Vec<f64>)> = BTreeMap::new();
        for row in &table.rows {
            let key = row[group_idx].to_string();
            let entry = groups
                .entry(key)
                .or_insert_with(|| (row[group_idx].clone(), Vec::new()));
            if let Some(idx) = value_idx {
                entry.1.push(numeric_cell(
                    &row[idx],
                    agg.column.as_deref().unwrap_or_default(),
                    agg.op,
                )?);
            } else {
                entry.1.push(0.0); // count only needs arity
            }
        }
        let mut out = Table::new(vec![group_col.clone(), derived]);
        for (_, (key_value, values)) in groups {
            let reduced = finalize(agg.op, &values)?;
            out.push_row(vec![key_value, reduced]);
        }
        Ok(out)
    } else {
        let mut values = Vec::with_capacity(table.rows.len());
        if let Some(idx) = value_idx {
            for row in &table.rows {
                values.push(numeric_cell(
                    &row[idx],
                    agg.column.as_deref().unwrap_or_default(),
                    agg.op,
                )?);
            }
        } else {
            values.resize(table.rows.len(), 0.0);
        }
        let reduced = finalize(agg.op, &values)?;
        let mut out = Table::new(vec![derived]);
        out.push_row(vec![reduced]);
        Ok(out)
    }
}

fn sort_rows(table: &mut Table, keys: &[SortKey]) -> ExecResult<()> {
    // Applied in reverse so the first key dominates (stable sort).
    for key in keys.iter().rev() {
        let idx = column_index(table, &key.column)?;

        // Mixed-type columns have no defined ordering; fail up front
        // rather than sorting nonsense.
        let all_numeric = table.rows.iter().all(|r| r[idx].is_number());
        let all_string = table.rows.iter().all(|r| r[idx].is_string());
        if !(all_numeric || all_string) && !table.rows.is_empty() {
            return Err(ExecFailure::new(
                ExecErrorKind::RuntimeError,
                format!("column \"{}\" mixes types and cannot be sorted", key.column),
            ));
        }

        table.rows.sort_by(|a, b| {
            let ord = if all_numeric {
                let (x, y) = (
                    a[idx].as_f64().unwrap_or_default(),
                    b[idx].as_f64().unwrap_or_default(),
                );
                x.total_cmp(&y)
            } else {
                a[idx]
                    .as_str()
                    .unwrap_or_default()
                    .cmp(b[idx].as_str().unwrap_or_default())
            };
            if key.descending { ord.reverse() } else { ord }
        });
    }
    Ok(())
}

fn project(table: Table, columns: &[String]) -> ExecResult<Table> {
    let mut indices = Vec::with_capacity(columns.len());
    for column in columns {
        indices.push(column_index(&table, column)?);
    }
    let mut out = Table::new(columns.to_vec());
    for row in table.rows {
        out.push_row(indices.iter().map(|&i| row[i].clone()).collect());
    }
    Ok(out)
}

fn build_output(table: Table, spec: &OutputSpec) -> ExecResult<Map<String, Value>> {
    let mut result = Map::new();
    match spec.shape {
        OutputShape::Table => Err(ExecFailure::new(
            ExecErrorKind::TypeContractViolation,
            "output shape \"table\" returns raw tabular data; reduce it to a plain mapping \
             with shape \"records\" or \"scalar\"",
        )),
        OutputShape::Records => {
            let records: Vec<Value> = table
                .rows
                .iter()
                .map(|row| {
                    Value::Object(
                        table
                            .columns
                            .iter()
                            .cloned()
                            .zip(row.iter().cloned())
                            .collect(),
                    )
                })
                .collect();
            let _ = result.insert(spec.key.clone(), Value::Array(records));
            Ok(result)
        }
        OutputShape::Scalar => {
            if table.rows.len() == 1 && table.columns.len() == 1 {
                let _ = result.insert(spec.key.clone(), table.rows[0][0].clone());
                Ok(result)
            } else {
                Err(ExecFailure::new(
                    ExecErrorKind::RuntimeError,
                    format!(
                        "scalar output requires exactly one value; the plan produced {} row(s) \
                         x {} column(s); aggregate without group_by, or use shape \"records\"",
                        table.rows.len(),
                        table.columns.len()
                    ),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_schema::sample::PlayerStatsLoader;
    use serde_json::json;

    fn eval(plan: serde_json::Value) -> ExecResult<Map<String, Value>> {
        let plan: QueryPlan = serde_json::from_value(plan).unwrap();
        let loader = PlayerStatsLoader::with_sample_data();
        evaluate(&plan, &loader)
    }

    #[test]
    fn top_five_rushers() {
        let result = eval(json!({
            "dataset": "player_stats",
            "params": {"season": 2025},
            "filters": [{"column": "position", "op": "eq", "value": "RB"}],
            "sort": [{"column": "rushing_yards", "descending": true}],
            "limit": 5,
            "select": ["player_name", "rushing_yards"],
            "output": {"shape": "records", "key": "top_rushers"}
        }))
        .unwrap();

        let rushers = result["top_rushers"].as_array().unwrap();
        assert_eq!(rushers.len(), 5);
        assert_eq!(rushers[0]["player_name"], "Marcus Vell");
        assert_eq!(rushers[0]["rushing_yards"], 1642);
        // Strictly descending
        let yards: Vec<i64> = rushers
            .iter()
            .map(|r| r["rushing_yards"].as_i64().unwrap())
            .collect();
        assert!(yards.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn scalar_aggregate_sum() {
        let result = eval(json!({
            "dataset": "player_stats",
            "params": {"season": 2025},
            "filters": [{"column": "position", "op": "eq", "value": "RB"}],
            "aggregate": {"op": "sum", "column": "rushing_yards"},
            "output": {"shape": "scalar", "key": "total_rushing_yards"}
        }))
        .unwrap();
        let total = result["total_rushing_yards"].as_f64().unwrap();
        assert!((total - 7793.0).abs() < f64::EPSILON);
    }

    #[test]
    fn group_by_produces_derived_column() {
        let result = eval(json!({
            "dataset": "player_stats",
            "params": {"season": 2025},
            "aggregate": {"op": "sum", "column": "rushing_yards", "group_by": "team"},
            "sort": [{"column": "sum_rushing_yards", "descending": true}],
            "limit": 3,
            "output": {"shape": "records", "key": "by_team"}
        }))
        .unwrap();
        let rows = result["by_team"].as_array().unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].get("sum_rushing_yards").is_some());
        assert!(rows[0].get("team").is_some());
    }

    #[test]
    fn missing_column_names_offender() {
        let err = eval(json!({
            "dataset": "player_stats",
            "filters": [{"column": "rush_yards", "op": "gt", "value": 1000}],
            "output": {"shape": "records"}
        }))
        .unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::ColumnNotFound);
        assert!(err.message.contains("rush_yards"));
    }

    #[test]
    fn table_output_violates_contract() {
        let err = eval(json!({
            "dataset": "player_stats",
            "output": {"shape": "table"}
        }))
        .unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::TypeContractViolation);
    }

    #[test]
    fn mean_over_zero_rows_is_non_finite() {
        let err = eval(json!({
            "dataset": "player_stats",
            "params": {"season": 1999},
            "aggregate": {"op": "mean", "column": "rushing_yards"},
            "output": {"shape": "scalar", "key": "avg"}
        }))
        .unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::TypeContractViolation);
        assert!(err.message.contains("non-finite"));
    }

    #[test]
    fn name_collision_is_ambiguous() {
        let err = eval(json!({
            "dataset": "player_stats",
            "params": {"season": 2025},
            "filters": [{"column": "player_name", "op": "eq", "value": "Jordan Banks"}],
            "unique_by": "player_id",
            "select": ["player_name", "passing_yards"],
            "output": {"shape": "records", "key": "player"}
        }))
        .unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::UnknownColumnSemantics);
        assert!(err.message.contains("player_id"));
    }

    #[test]
    fn unique_constraint_passes_with_discriminator() {
        let result = eval(json!({
            "dataset": "player_stats",
            "params": {"season": 2025},
            "filters": [
                {"column": "player_name", "op": "eq", "value": "Jordan Banks"},
                {"column": "position", "op": "eq", "value": "QB"}
            ],
            "unique_by": "player_id",
            "select": ["player_name", "passing_yards"],
            "output": {"shape": "records", "key": "player"}
        }))
        .unwrap();
        let rows = result["player"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["passing_yards"], 4388);
    }

    #[test]
    fn type_mismatch_in_filter_is_runtime_error() {
        let err = eval(json!({
            "dataset": "player_stats",
            "filters": [{"column": "rushing_yards", "op": "gt", "value": "1000"}],
            "output": {"shape": "records"}
        }))
        .unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::RuntimeError);
        assert!(err.message.contains("rushing_yards"));
    }

    #[test]
    fn scalar_without_reduction_is_runtime_error() {
        let err = eval(json!({
            "dataset": "player_stats",
            "output": {"shape": "scalar", "key": "value"}
        }))
        .unwrap_err();
        assert_eq!(err.kind, ExecErrorKind::RuntimeError);
    }

    #[test]
    fn count_needs_no_column() {
        let result = eval(json!({
            "dataset": "player_stats",
            "params": {"season": 2025},
            "filters": [{"column": "position", "op": "eq", "value": "RB"}],
            "aggregate": {"op": "count"},
            "output": {"shape": "scalar", "key": "rb_count"}
        }))
        .unwrap();
        assert_eq!(result["rb_count"], json!(6));
    }

    #[test]
    fn contains_filter_is_case_insensitive() {
        let result = eval(json!({
            "dataset": "player_stats",
            "params": {"season": 2025},
            "filters": [{"column": "player_name", "op": "contains", "value": "vell"}],
            "select": ["player_name"],
            "output": {"shape": "records", "key": "matches"}
        }))
        .unwrap();
        let rows = result["matches"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["player_name"], "Marcus Vell");
    }
}
