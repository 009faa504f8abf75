//! HTTP API server.
//!
//! Exposes the ingestion and QA pipelines as a JSON HTTP API. The
//! authenticated owner identifier arrives in the `x-user-id` header,
//! populated by the auth layer in front of this service; a request
//! without one is rejected as unauthorized before touching the store.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/ingest` | Chunk + embed one completed document |
//! | `POST` | `/api/qa` | Answer a question over the caller's documents |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "Document not found" } }
//! ```
//!
//! Codes: `unauthorized` (401), `bad_request` (400), `not_found` (404),
//! `misconfigured` (500), `timeout` (504), `upstream` (502),
//! `internal` (500). Upstream and internal failures are logged with full
//! detail server-side and surfaced with a generic message only.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::db;
use crate::embedding::{create_embedder, DisabledEmbedder, Embedder};
use crate::error::PipelineError;
use crate::generate::{create_generator, DisabledGenerator, Generator};
use crate::ingest::ingest_document;
use crate::models::QaAnswer;
use crate::qa::answer_question;
use crate::store::VectorStore;

/// Shared application state. The embedding and generation clients are
/// constructed once at startup and injected everywhere, rather than
/// living in module-level globals.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
}

/// Start the HTTP server on the configured bind address.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let store = VectorStore::new(pool);

    // A misconfigured provider must not keep the server from booting;
    // requests get a distinct `misconfigured` error instead.
    let embedder: Arc<dyn Embedder> = match create_embedder(&config.embedding) {
        Ok(e) => Arc::from(e),
        Err(e) => {
            tracing::warn!(error = %e, "embedding provider unavailable, serving misconfigured errors");
            Arc::new(DisabledEmbedder)
        }
    };
    let generator: Arc<dyn Generator> = match create_generator(&config.generation) {
        Ok(g) => Arc::from(g),
        Err(e) => {
            tracing::warn!(error = %e, "generation provider unavailable, serving misconfigured errors");
            Arc::new(DisabledGenerator)
        }
    };

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        embedder,
        generator,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/ingest", post(handle_ingest))
        .route("/api/qa", post(handle_qa))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    let bind_addr = &config.server.bind;
    tracing::info!("listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let status = match &err {
            PipelineError::Unauthorized => StatusCode::UNAUTHORIZED,
            PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
            PipelineError::BadRequest(_) => StatusCode::BAD_REQUEST,
            PipelineError::Misconfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Upstream(_) => StatusCode::BAD_GATEWAY,
            PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Full detail stays in the logs; the Display impls of the
        // upstream/internal variants are already generic.
        match &err {
            PipelineError::Upstream(source) => {
                tracing::error!(error = %source, "upstream failure");
            }
            PipelineError::Internal(source) => {
                tracing::error!(error = %source, "internal failure");
            }
            _ => {}
        }

        let message = match &err {
            PipelineError::Internal(_) => "internal error".to_string(),
            other => other.to_string(),
        };

        AppError {
            status,
            code: err.code(),
            message,
        }
    }
}

/// Extract the authenticated owner identifier from the request headers.
fn require_user(headers: &HeaderMap) -> Result<String, PipelineError> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(PipelineError::Unauthorized)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/ingest ============

#[derive(Deserialize)]
struct IngestRequest {
    #[serde(rename = "documentId")]
    document_id: String,
    #[serde(default)]
    reindex: bool,
}

#[derive(Serialize)]
struct IngestResponse {
    success: bool,
    chunks: usize,
}

async fn handle_ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    let user_id = require_user(&headers)?;

    if req.document_id.trim().is_empty() {
        return Err(PipelineError::BadRequest("documentId is required".to_string()).into());
    }

    let outcome = ingest_document(
        &state.store,
        state.embedder.as_ref(),
        &state.config,
        &user_id,
        &req.document_id,
        req.reindex,
    )
    .await?;

    Ok(Json(IngestResponse {
        success: true,
        chunks: outcome.chunk_count,
    }))
}

// ============ POST /api/qa ============

#[derive(Deserialize)]
struct QaRequest {
    question: String,
    #[serde(rename = "documentIds", default)]
    document_ids: Option<Vec<String>>,
    #[serde(rename = "topK", default)]
    top_k: Option<usize>,
}

async fn handle_qa(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<QaRequest>,
) -> Result<Json<QaAnswer>, AppError> {
    let user_id = require_user(&headers)?;

    // An empty id list means "all of the caller's completed documents".
    let scope = req.document_ids.filter(|ids| !ids.is_empty());

    let result = answer_question(
        &state.store,
        state.embedder.as_ref(),
        state.generator.as_ref(),
        &state.config,
        &user_id,
        &req.question,
        scope.as_deref(),
        req.top_k,
    )
    .await?;

    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_user_present() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "u42".parse().unwrap());
        assert_eq!(require_user(&headers).unwrap(), "u42");
    }

    #[test]
    fn test_require_user_missing_is_unauthorized() {
        let headers = HeaderMap::new();
        assert!(matches!(
            require_user(&headers).unwrap_err(),
            PipelineError::Unauthorized
        ));
    }

    #[test]
    fn test_require_user_blank_is_unauthorized() {
        let mut headers = HeaderMap::new();
        headers.insert("x-user-id", "   ".parse().unwrap());
        assert!(matches!(
            require_user(&headers).unwrap_err(),
            PipelineError::Unauthorized
        ));
    }

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(PipelineError, StatusCode)> = vec![
            (PipelineError::Unauthorized, StatusCode::UNAUTHORIZED),
            (PipelineError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PipelineError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                PipelineError::Misconfigured("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (PipelineError::Timeout, StatusCode::GATEWAY_TIMEOUT),
            (
                PipelineError::Upstream(anyhow::anyhow!("detail")),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, expected) in cases {
            let app_err: AppError = err.into();
            assert_eq!(app_err.status, expected);
        }
    }

    #[test]
    fn test_upstream_detail_never_reaches_client() {
        let err = PipelineError::Upstream(anyhow::anyhow!("secret api body"));
        let app_err: AppError = err.into();
        assert!(!app_err.message.contains("secret"));
    }

    #[test]
    fn test_internal_detail_never_reaches_client() {
        let err = PipelineError::Internal(anyhow::anyhow!("sql constraint xyz"));
        let app_err: AppError = err.into();
        assert_eq!(app_err.message, "internal error");
    }
}
