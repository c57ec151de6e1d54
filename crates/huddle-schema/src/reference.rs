//! The read-only schema reference.
//!
//! Built once at startup from the loader registry, shared as
//! `Arc<SchemaReference>`, and never mutated at runtime. It grounds the
//! generation model and backs the sandbox's column validation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::loader::ParamSpec;

/// Schema of one loader: parameter signature plus available columns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSchema {
    /// One-line loader description.
    pub description: String,
    /// Declared parameters.
    pub parameters: Vec<ParamSpec>,
    /// Available column names.
    pub columns: BTreeSet<String>,
}

/// Mapping from loader name to its schema.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaReference {
    loaders: BTreeMap<String, LoaderSchema>,
}

impl SchemaReference {
    /// Build a reference from loader schemas.
    pub fn new(loaders: BTreeMap<String, LoaderSchema>) -> Self {
        Self { loaders }
    }

    /// Schema for a loader, if registered.
    #[must_use]
    pub fn get(&self, loader: &str) -> Option<&LoaderSchema> {
        self.loaders.get(loader)
    }

    /// Whether a loader exposes the given column.
    #[must_use]
    pub fn has_column(&self, loader: &str, column: &str) -> bool {
        self.loaders
            .get(loader)
            .is_some_and(|s| s.columns.contains(column))
    }

    /// Registered loader names, sorted.
    pub fn loader_names(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    /// Iterate over all loader schemas, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LoaderSchema)> {
        self.loaders.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered loaders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Whether no loader is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> SchemaReference {
        let mut loaders = BTreeMap::new();
        let _ = loaders.insert(
            "player_stats".to_string(),
            LoaderSchema {
                description: "Per-player season stats".into(),
                parameters: vec![ParamSpec::new("season", "season to load")],
                columns: ["player_name", "rushing_yards"]
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
            },
        );
        SchemaReference::new(loaders)
    }

    #[test]
    fn has_column_checks_loader_and_column() {
        let r = reference();
        assert!(r.has_column("player_stats", "rushing_yards"));
        assert!(!r.has_column("player_stats", "rush_yards"));
        assert!(!r.has_column("team_stats", "rushing_yards"));
    }

    #[test]
    fn loader_names_sorted() {
        let r = reference();
        let names: Vec<_> = r.loader_names().collect();
        assert_eq!(names, vec!["player_stats"]);
    }

    #[test]
    fn serde_roundtrip() {
        let r = reference();
        let json = serde_json::to_string(&r).unwrap();
        let back: SchemaReference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
