//! HTTP server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/analyze` | Triage a CI/CD log: `{"log": "..."}` |
//! | `GET`  | `/health` | Liveness probe, always `{"status": "ok"}` |
//!
//! # Error Contract
//!
//! Only malformed requests produce a non-2xx status. The body is always:
//!
//! ```json
//! { "error": "No log content provided" }
//! ```
//!
//! A failing language model is *not* an error: `/analyze` still answers
//! `200` and describes the failure in `root_cause`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser dashboards can
//! post logs directly.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::{Config, ServerConfig};
use crate::llm::{create_client, CompletionClient};
use crate::models::AnalysisReport;
use crate::pipeline;

/// Message returned when the request carries no usable `log` field.
pub const NO_LOG_MESSAGE: &str = "No log content provided";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    /// Completion client resolved once at startup.
    client: Arc<dyn CompletionClient>,
}

/// Starts the HTTP server with the client selected by `[llm].api`.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let client = create_client(&config.llm)?;
    run_server_with_client(config, client).await
}

/// Starts the HTTP server with a caller-supplied [`CompletionClient`].
pub async fn run_server_with_client(
    config: &Config,
    client: Arc<dyn CompletionClient>,
) -> anyhow::Result<()> {
    let app = build_router(&config.server, client);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "ci-triage listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router without binding a socket.
pub fn build_router(server: &ServerConfig, client: Arc<dyn CompletionClient>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/analyze", post(handle_analyze))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { client })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

/// Map body-extraction failures to the error contract.
///
/// A body that is valid JSON but has the wrong shape (e.g. `"log": 42`) is
/// treated like a missing `log`. Anything else keeps the extractor's status
/// and message (415 for a wrong content type, 400 for invalid JSON, 413 for
/// an oversized body).
fn reject(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(_) => bad_request(NO_LOG_MESSAGE),
        other => AppError {
            status: other.status(),
            message: other.body_text(),
        },
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// ============ POST /analyze ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(default)]
    log: Option<String>,
}

/// Handler for `POST /analyze`.
///
/// Validates the body, then runs the full pipeline. Returns `400` only when
/// `log` is absent; model failures still yield `200`.
async fn handle_analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalysisReport>, AppError> {
    let Json(request) = payload.map_err(reject)?;
    let log = request.log.ok_or_else(|| bad_request(NO_LOG_MESSAGE))?;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("analyze", %request_id, log_bytes = log.len());
    let report = pipeline::analyze_log(state.client.as_ref(), &log)
        .instrument(span.clone())
        .await;

    span.in_scope(|| {
        tracing::info!(
            platform = %report.platform,
            failed_step = %report.failed_step,
            "analysis complete"
        )
    });

    Ok(Json(report))
}
