//! # huddle-schema
//!
//! The dataset side of the pipeline: the [`DatasetLoader`] trait the
//! sandbox executes plans against, the [`LoaderRegistry`] that names them,
//! the read-only [`SchemaReference`] derived from the registry at startup,
//! and the tabular [`Table`] type loaders return.
//!
//! Loader internals are collaborators behind the trait. This crate ships
//! two seeded in-memory loaders so the rest of the workspace is testable
//! end to end; production deployments register their own.

pub mod loader;
pub mod reference;
pub mod registry;
pub mod sample;
pub mod table;

pub use loader::{DatasetLoader, LoaderError, LoaderParams, ParamSpec};
pub use reference::{LoaderSchema, SchemaReference};
pub use registry::LoaderRegistry;
pub use table::Table;
