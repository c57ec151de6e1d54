//! Columnar table returned by dataset loaders.

use serde_json::Value;

/// Tabular data: named columns plus rows of values aligned to them.
///
/// Deliberately not JSON-object-per-row; the sandbox's output contract
/// rejects raw tables, forcing plans to reduce them to plain mappings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    /// Column names, in order.
    pub columns: Vec<String>,
    /// Rows; each row has exactly `columns.len()` values.
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Index of a column by name.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row. The row must be aligned to `columns`.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row/column arity mismatch");
        self.rows.push(row);
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_by_two() -> Table {
        let mut t = Table::new(vec!["name".into(), "yards".into()]);
        t.push_row(vec![json!("A"), json!(100)]);
        t.push_row(vec![json!("B"), json!(200)]);
        t
    }

    #[test]
    fn column_index_lookup() {
        let t = two_by_two();
        assert_eq!(t.column_index("yards"), Some(1));
        assert_eq!(t.column_index("missing"), None);
    }

    #[test]
    fn len_and_empty() {
        let t = two_by_two();
        assert_eq!(t.len(), 2);
        assert!(!t.is_empty());
        assert!(Table::new(vec!["a".into()]).is_empty());
    }
}
