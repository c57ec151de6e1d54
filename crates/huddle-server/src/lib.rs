//! # huddle-server
//!
//! The HTTP surface over the pipeline:
//!
//! - [`config`]: bind address configuration
//! - [`health`]: `/health` response
//! - [`server`]: router, handlers, and the serve loop
//! - [`shutdown`]: graceful shutdown coordination

pub mod config;
pub mod health;
pub mod server;
pub mod shutdown;

pub use config::ServerConfig;
pub use server::{AppState, ChatRequest, HuddleServer};
pub use shutdown::ShutdownCoordinator;
