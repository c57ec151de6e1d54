//! `HuddleServer`: Axum HTTP server over the pipeline.
//!
//! Routes:
//! - `GET /health`: liveness and dataset count
//! - `POST /chat`: run the pipeline, return only the terminal result
//! - `POST /chat/stream`: run the pipeline, stream progress frames as SSE

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use huddle_core::conversation::latest_user_content;
use huddle_core::{ConversationTurn, PipelineResult};
use huddle_pipeline::Pipeline;

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The configured pipeline.
    pub pipeline: Arc<Pipeline>,
    /// Shutdown coordinator; in-flight runs get child tokens.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Number of registered dataset loaders, reported by `/health`.
    pub datasets: usize,
}

/// Request body for `/chat` and `/chat/stream`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Conversation turns, oldest first.
    pub messages: Vec<ConversationTurn>,
}

/// Error body returned by the chat endpoints.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({"error": self.message}))).into_response()
    }
}

/// The HTTP server.
pub struct HuddleServer {
    config: ServerConfig,
    pipeline: Arc<Pipeline>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    datasets: usize,
}

impl HuddleServer {
    /// Create a new server over a pipeline.
    #[must_use]
    pub fn new(config: ServerConfig, pipeline: Arc<Pipeline>, datasets: usize) -> Self {
        Self {
            config,
            pipeline,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            datasets,
        }
    }

    /// Build the Axum router with all routes.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            pipeline: Arc::clone(&self.pipeline),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            datasets: self.datasets,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/chat", post(chat_handler))
            .route("/chat/stream", post(chat_stream_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Get the shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind and serve until the shutdown coordinator fires.
    ///
    /// # Errors
    ///
    /// Fails when the listener cannot bind or the server errors while
    /// serving.
    pub async fn serve(self) -> std::io::Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %listener.local_addr()?, "listening");

        let token = self.shutdown.token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
    }
}

fn validate(request: &ChatRequest) -> Result<(), ApiError> {
    if request.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }
    if latest_user_content(&request.messages).is_none() {
        return Err(ApiError::bad_request(
            "messages must include a user question",
        ));
    }
    Ok(())
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, state.datasets))
}

/// POST /chat: blocking variant; progress frames are discarded.
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<PipelineResult>, ApiError> {
    validate(&request)?;

    let cancel = state.shutdown.token().child_token();
    match state.pipeline.run_collect(request.messages, cancel).await {
        Some(result) => Ok(Json(result)),
        None => Err(ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "the run was interrupted before producing a result".into(),
        }),
    }
}

/// POST /chat/stream: each pipeline event becomes one SSE `data:` frame.
///
/// Client disconnect drops the response stream, which cancels the run via
/// the token's drop guard.
async fn chat_stream_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    validate(&request)?;

    let cancel = state.shutdown.token().child_token();
    let guard = cancel.clone().drop_guard();
    let mut events = state.pipeline.run(request.messages, cancel);

    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = events.next().await {
            yield Event::default().json_data(&event);
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
