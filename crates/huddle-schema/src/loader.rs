//! The dataset loader contract.
//!
//! A loader exposes a fixed set of columns and a small parameter surface
//! (season/filter style). The schema reference is the contract the
//! generation model is grounded on; loaders must honor it exactly.

use serde::{Deserialize, Serialize};

use crate::table::Table;

/// Errors a dataset loader can raise.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// A parameter value the loader cannot serve (e.g. a season outside
    /// its coverage).
    #[error("unsupported parameter: {message}")]
    UnsupportedParam {
        /// Error description.
        message: String,
    },

    /// Loader-internal failure (I/O, upstream service, ...).
    #[error("loader error: {message}")]
    Internal {
        /// Error description.
        message: String,
    },
}

/// Parameters accepted by a loader's `load` call.
///
/// All fields are optional; a loader returns its full coverage when no
/// parameter narrows it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderParams {
    /// Season to load (e.g. 2025).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<i64>,
    /// Week within the season.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week: Option<i64>,
}

/// Declared parameter of a loader, surfaced in the schema reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name (matches a [`LoaderParams`] field).
    pub name: String,
    /// Short description for prompt grounding.
    pub description: String,
}

impl ParamSpec {
    /// Build a parameter spec.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A named dataset loader the sandbox can execute plans against.
///
/// Implementors must be `Send + Sync`; `load` runs on a blocking thread
/// inside the sandbox's timeout and must return a fresh [`Table`] per call
/// (no state crosses attempts).
pub trait DatasetLoader: Send + Sync {
    /// Loader name as referenced by query plans (e.g. `"player_stats"`).
    fn name(&self) -> &str;

    /// One-line description for prompt grounding.
    fn description(&self) -> &str;

    /// Parameters this loader accepts.
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Column names this loader's tables carry; fixed per loader.
    fn columns(&self) -> Vec<String>;

    /// Load tabular data for the given parameters.
    fn load(&self, params: &LoaderParams) -> Result<Table, LoaderError>;
}
