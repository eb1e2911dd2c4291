//! HTTP interface: `/health`, `/retrieve` and `/ask`.
//!
//! Retrieval and generation are blocking, so handlers move them onto
//! `spawn_blocking` and keep the runtime threads free.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::answer::Answerer;
use crate::error::{ErrorCategory, RagError, RagResult};
use crate::vector::ScoredChunk;

#[derive(Clone)]
pub struct AppState {
    answerer: Arc<Answerer>,
}

impl AppState {
    pub fn new(answerer: Answerer) -> Self {
        Self {
            answerer: Arc::new(answerer),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub q: String,
    #[serde(default)]
    pub k: Option<usize>,
    /// Include the retrieved chunks in the response
    #[serde(default)]
    pub context: bool,
}

#[derive(Debug, Deserialize)]
pub struct RetrieveParams {
    pub q: String,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<ScoredChunk>>,
}

#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub query: String,
    pub k: usize,
    pub chunks: Vec<ScoredChunk>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status_code: String,
    pub category: &'static str,
    pub message: String,
}

/// HTTP-facing wrapper so handlers can return `RagError` with `?`.
#[derive(Debug)]
pub struct ApiError(RagError);

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn http_status(&self) -> StatusCode {
        match &self.0 {
            RagError::IndexNotFound { .. } => StatusCode::NOT_FOUND,
            RagError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            RagError::RemoteCall { .. } => StatusCode::BAD_GATEWAY,
            err => match err.category() {
                ErrorCategory::FixInput => StatusCode::BAD_REQUEST,
                ErrorCategory::RetryLater => StatusCode::SERVICE_UNAVAILABLE,
                ErrorCategory::FixConfiguration
                | ErrorCategory::Reingest
                | ErrorCategory::Environment => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self.0);
        }
        let body = ErrorBody {
            status_code: self.0.status_code(),
            category: self.0.category().as_str(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/retrieve", get(retrieve))
        .route("/ask", get(ask))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn retrieve(
    State(state): State<AppState>,
    Query(params): Query<RetrieveParams>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let answerer = Arc::clone(&state.answerer);
    let response = run_blocking(move || {
        let service = answerer.retrieval();
        let k = service.effective_k(params.k);
        let chunks = service.retrieve(&params.q, Some(k))?;
        Ok(RetrieveResponse {
            query: params.q,
            k,
            chunks,
        })
    })
    .await?;
    Ok(Json(response))
}

async fn ask(
    State(state): State<AppState>,
    Query(params): Query<AskParams>,
) -> Result<Json<AskResponse>, ApiError> {
    let answerer = Arc::clone(&state.answerer);
    let answer = run_blocking(move || answerer.ask(&params.q, params.k)).await?;
    Ok(Json(AskResponse {
        answer: answer.answer,
        chunks: params.context.then_some(answer.chunks),
    }))
}

async fn run_blocking<T, F>(work: F) -> RagResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> RagResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| RagError::config(format!("request worker failed: {e}")))?
}

/// Binds `bind` and serves until Ctrl+C.
pub async fn serve(answerer: Answerer, bind: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Listening on http://{bind}");
    eprintln!("docent listening on http://{bind}");
    eprintln!("  GET /ask?q=...&k=...&context=true");
    eprintln!("  GET /retrieve?q=...&k=...");
    eprintln!("  GET /health");
    eprintln!("Press Ctrl+C to stop the server");

    axum::serve(listener, router(AppState::new(answerer)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    eprintln!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl+c: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
