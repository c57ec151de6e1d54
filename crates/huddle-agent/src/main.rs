//! # huddle-agent
//!
//! Server binary: wires together settings, dataset loaders, the model
//! backend, the pipeline, and the HTTP server.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use huddle_llm::codegen::CodegenClient;
use huddle_llm::openai::{OpenAiBackend, OpenAiConfig};
use huddle_llm::validator::Validator;
use huddle_llm::LanguageModel;
use huddle_pipeline::{Pipeline, PipelineConfig};
use huddle_sandbox::Sandbox;
use huddle_schema::LoaderRegistry;
use huddle_schema::sample::{PlayerStatsLoader, TeamStatsLoader};
use huddle_server::{HuddleServer, ServerConfig};
use huddle_settings::HuddleSettings;

/// Huddle stats server.
#[derive(Parser, Debug)]
#[command(name = "huddle-agent", about = "Natural-language football stats server")]
struct Cli {
    /// Host to bind (overrides settings if specified).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings if specified).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the settings file (default `~/.huddle/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn load_settings(cli: &Cli) -> Result<HuddleSettings> {
    let path = cli
        .settings
        .clone()
        .unwrap_or_else(huddle_settings::settings_path);
    let mut settings = huddle_settings::load_settings_from_path(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    if let Some(host) = &cli.host {
        settings.server.host = host.clone();
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }
    Ok(settings)
}

fn build_pipeline(settings: &HuddleSettings) -> Result<(Arc<Pipeline>, usize)> {
    let mut registry = LoaderRegistry::new();
    registry.register(Arc::new(PlayerStatsLoader::with_sample_data()));
    registry.register(Arc::new(TeamStatsLoader::with_sample_data()));
    let datasets = registry.len();

    let sandbox = Sandbox::new(
        Arc::new(registry),
        Duration::from_secs(settings.pipeline.execution_timeout_secs),
    );
    let schema = sandbox.schema();

    let backend: Arc<dyn LanguageModel> = Arc::new(
        OpenAiBackend::new(OpenAiConfig {
            base_url: settings.llm.base_url.clone(),
            api_key: settings.llm.api_key.clone(),
            request_timeout: Duration::from_secs(settings.llm.request_timeout_secs),
        })
        .context("failed to build the model backend")?,
    );

    let codegen = CodegenClient::new(Arc::clone(&backend), schema, settings.current_season);
    let validator = Validator::new(backend, settings.llm.validator_model.clone());
    let config = PipelineConfig {
        primary_model: settings.llm.primary_model.clone(),
        fallback_model: settings.llm.fallback_model.clone(),
        max_attempts_primary: settings.pipeline.max_attempts_primary,
        max_attempts_fallback: settings.pipeline.max_attempts_fallback,
    };

    Ok((
        Arc::new(Pipeline::new(codegen, validator, sandbox, config)),
        datasets,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    if settings.llm.api_key.is_none() {
        tracing::warn!(
            "no API key configured (set HUDDLE_API_KEY or llm.api_key in settings); \
             requests will fail against authenticated backends"
        );
    }

    let (pipeline, datasets) = build_pipeline(&settings)?;
    tracing::info!(
        datasets,
        primary = %settings.llm.primary_model,
        fallback = %settings.llm.fallback_model,
        season = settings.current_season,
        "pipeline ready"
    );

    let config = ServerConfig {
        host: settings.server.host.clone(),
        port: settings.server.port,
    };
    let server = HuddleServer::new(config, pipeline, datasets);
    let shutdown = Arc::clone(server.shutdown());

    let handle = tokio::spawn(server.serve());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    shutdown.shutdown();

    handle.await.context("server task panicked")??;
    tracing::info!("shutdown complete");
    Ok(())
}
