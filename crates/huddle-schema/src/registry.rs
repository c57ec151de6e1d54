//! Loader registry: named dataset loaders behind trait objects.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::loader::DatasetLoader;
use crate::reference::{LoaderSchema, SchemaReference};

/// Registry of dataset loaders, keyed by name.
///
/// Populated once at startup; the derived [`SchemaReference`] is the
/// read-only contract handed to the generation model and the sandbox.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: BTreeMap<String, Arc<dyn DatasetLoader>>,
}

impl LoaderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a loader under its own name. Re-registering a name
    /// replaces the previous loader.
    pub fn register(&mut self, loader: Arc<dyn DatasetLoader>) {
        let _ = self.loaders.insert(loader.name().to_string(), loader);
    }

    /// Look up a loader by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn DatasetLoader>> {
        self.loaders.get(name).cloned()
    }

    /// Registered loader names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    /// Number of registered loaders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Derive the read-only schema reference from the registered loaders.
    #[must_use]
    pub fn schema_reference(&self) -> SchemaReference {
        let loaders = self
            .loaders
            .iter()
            .map(|(name, loader)| {
                (
                    name.clone(),
                    LoaderSchema {
                        description: loader.description().to_string(),
                        parameters: loader.parameters(),
                        columns: loader.columns().into_iter().collect(),
                    },
                )
            })
            .collect();
        SchemaReference::new(loaders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{PlayerStatsLoader, TeamStatsLoader};

    fn registry() -> LoaderRegistry {
        let mut r = LoaderRegistry::new();
        r.register(Arc::new(PlayerStatsLoader::with_sample_data()));
        r.register(Arc::new(TeamStatsLoader::with_sample_data()));
        r
    }

    #[test]
    fn register_and_get() {
        let r = registry();
        assert_eq!(r.len(), 2);
        assert!(r.get("player_stats").is_some());
        assert!(r.get("nonexistent").is_none());
    }

    #[test]
    fn names_sorted() {
        let r = registry();
        let names: Vec<_> = r.names().collect();
        assert_eq!(names, vec!["player_stats", "team_stats"]);
    }

    #[test]
    fn schema_reference_covers_all_loaders() {
        let r = registry();
        let schema = r.schema_reference();
        assert_eq!(schema.len(), 2);
        assert!(schema.has_column("player_stats", "rushing_yards"));
        assert!(schema.has_column("team_stats", "points_for"));
    }

    #[test]
    fn reregister_replaces() {
        let mut r = registry();
        let before = r.len();
        r.register(Arc::new(PlayerStatsLoader::with_sample_data()));
        assert_eq!(r.len(), before);
    }
}
