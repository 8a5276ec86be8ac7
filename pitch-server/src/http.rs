//! Pitch HTTP API
//!
//! Axum-based HTTP server that turns a startup idea into a pitch, landing page,
//! tech stack and feature list.
//!
//! Each endpoint has a thin axum handler that delegates to an inner function.
//! The inner functions are directly testable without axum dispatch machinery.
//!
//! Endpoints:
//! - POST /generate — generate and store an artifact for an idea
//! - GET  /health   — health check with store status
//! - GET  /version  — server version info

use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use pitch_core::{generate, CompletionBackend, GenerateError, HistoryStore, IdeaRequest, PitchConfig};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

/// Shared state for all HTTP handlers. Built once at start.
#[derive(Clone)]
pub struct HttpState {
    pub config: PitchConfig,
    pub completion: Arc<dyn CompletionBackend>,
    pub store: Arc<dyn HistoryStore>,
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    let cors = cors_layer(state.config.http.cors_allowed_origins.as_deref());

    Router::new()
        .route("/generate", post(generate_handler))
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .layer(cors)
        .with_state(state)
}

/// Any origin unless a comma-separated allow-list is configured.
pub fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.http.host, state.config.http.port);

    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Pitch HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Standard HTTP error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            error: msg.into(),
            details: None,
        }
    }

    pub fn with_details(msg: impl Into<String>, details: impl ToString) -> Self {
        Self {
            error: msg.into(),
            details: Some(details.to_string()),
        }
    }

    fn into_value(self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({ "error": "internal error" }))
    }
}

/// Map a generation failure onto its status code and JSON body.
pub fn error_to_http(err: &GenerateError) -> (StatusCode, serde_json::Value) {
    let (status, body) = match err {
        GenerateError::MissingIdea => (StatusCode::BAD_REQUEST, ErrorResponse::new(err.to_string())),
        GenerateError::Upstream(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::with_details("Failed to get a response from the completion provider", e),
        ),
        GenerateError::Parse(e) if err.is_schema_mismatch() => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::with_details("Completion response does not match the artifact schema", e),
        ),
        GenerateError::Parse(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::with_details("Failed to parse completion response as JSON", e),
        ),
        GenerateError::Storage(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::with_details("Failed to store generated artifact", e),
        ),
    };
    (status, body.into_value())
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner generate — runs the pipeline and converts the outcome to HTTP.
pub async fn generate_inner(
    completion: &dyn CompletionBackend,
    store: &dyn HistoryStore,
    payload: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = IdeaRequest::from_payload(&payload);

    match generate(request, completion, store).await {
        Ok(record) => match serde_json::to_value(&record) {
            Ok(body) => (StatusCode::OK, body),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::with_details("Failed to encode generated artifact", e).into_value(),
            ),
        },
        Err(e) => {
            match &e {
                GenerateError::MissingIdea => tracing::warn!(kind = e.kind(), "Rejected generate request"),
                _ => tracing::error!(
                    kind = e.kind(),
                    backend = completion.name(),
                    model = completion.model(),
                    error = %e,
                    "Generate request failed"
                ),
            }
            error_to_http(&e)
        }
    }
}

/// Inner health check — probes the store and returns (status_code, json_body).
pub async fn health_inner(store: &dyn HistoryStore) -> (StatusCode, serde_json::Value) {
    match store.health().await {
        Ok(backend) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "store": backend,
                "collection": store.collection(),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            serde_json::json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "service": "pitch",
    })
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn generate_handler(
    State(state): State<Arc<HttpState>>,
    payload: std::result::Result<Json<serde_json::Value>, JsonRejection>,
) -> impl IntoResponse {
    let (status, body) = match payload {
        Ok(Json(payload)) => {
            generate_inner(state.completion.as_ref(), state.store.as_ref(), payload).await
        }
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "Rejected malformed request body");
            (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details("Invalid JSON body", rejection.body_text()).into_value(),
            )
        }
    };
    (status, Json(body))
}

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(state.store.as_ref()).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================
