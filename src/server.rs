//! HTTP transport.
//!
//! Exposes the retriever over a small JSON API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (version and chunk count) |
//! | `POST` | `/documents` | Upload a PDF or image (multipart field `file`) and ingest it |
//! | `POST` | `/search` | `{ query, top_k?, source? }` → `{ results }` |
//! | `POST` | `/context` | `{ query, max_length? }` → `{ context }` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! | Code | Status | When |
//! |------|--------|------|
//! | `bad_request` | 400 | missing file or query, unsupported type, no text extracted |
//! | `not_found` | 404 | `source` names no indexed document |
//! | `internal` | 500 | extraction, embedding or storage failure |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser front ends
//! can call the API directly.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use docsift_core::models::{DocType, SearchResult};

use crate::config::Config;
use crate::retriever::Retriever;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    retriever: Arc<Retriever>,
    upload_dir: Arc<PathBuf>,
}

/// Open the configured retriever and serve until the process is stopped.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let retriever = Arc::new(Retriever::open(config).await?);
    run_server_with(config, retriever).await
}

/// Serve an already-open retriever on `[server].bind`.
pub async fn run_server_with(config: &Config, retriever: Arc<Retriever>) -> anyhow::Result<()> {
    let app = router(config, retriever);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(addr = %listener.local_addr()?, "docsift server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router without binding a socket.
pub fn router(config: &Config, retriever: Arc<Retriever>) -> Router {
    let state = AppState {
        retriever,
        upload_dir: Arc::new(config.server.upload_dir.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents", post(handle_upload))
        .route("/search", post(handle_search))
        .route("/context", post(handle_context))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .layer(cors)
        .with_state(state)
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

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
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

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<docsift_core::Error> for AppError {
    fn from(err: docsift_core::Error) -> Self {
        use docsift_core::Error;
        match err {
            Error::UnsupportedType(_) | Error::EmptyResult(_) | Error::InvalidInput(_) => {
                bad_request(err.to_string())
            }
            Error::NotFound(_) => not_found(err.to_string()),
            other => internal(other.to_string()),
        }
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    chunks: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        chunks: state.retriever.len(),
    })
}

#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    source: String,
    chunks_added: usize,
    persisted: bool,
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| bad_request("no file selected"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;
        upload = Some((file_name, bytes));
        break;
    }

    let (file_name, bytes) = upload.ok_or_else(|| bad_request("no file provided"))?;
    if DocType::from_path(Path::new(&file_name)).is_none() {
        return Err(bad_request(format!("unsupported file type: {}", file_name)));
    }

    let dir = state.upload_dir.join(uuid::Uuid::new_v4().to_string());
    let path = dir.join(&file_name);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| internal(format!("failed to store upload: {}", e)))?;
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| internal(format!("failed to store upload: {}", e)))?;

    match state.retriever.ingest(&path).await {
        Ok(report) => Ok(Json(UploadResponse {
            message: "Document processed successfully",
            source: report.source,
            chunks_added: report.chunks_added,
            persisted: report.persisted,
        })),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "upload not indexed");
            if let Err(cleanup) = tokio::fs::remove_dir_all(&dir).await {
                warn!(dir = %dir.display(), error = %cleanup, "failed to remove rejected upload");
            }
            Err(e.into())
        }
    }
}

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let top_k = req.top_k.unwrap_or(state.retriever.settings().top_k);
    if top_k == 0 {
        return Err(bad_request("top_k must be >= 1"));
    }

    let results = state
        .retriever
        .try_search(&req.query, top_k, req.source.as_deref())
        .await?;
    Ok(Json(SearchResponse { results }))
}

#[derive(Deserialize)]
struct ContextRequest {
    query: String,
    #[serde(default)]
    max_length: Option<usize>,
}

#[derive(Serialize)]
struct ContextResponse {
    context: String,
}

async fn handle_context(
    State(state): State<AppState>,
    Json(req): Json<ContextRequest>,
) -> Result<Json<ContextResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let max_length = req
        .max_length
        .unwrap_or(state.retriever.settings().max_context_length);

    let context = state.retriever.get_context(&req.query, max_length).await;
    Ok(Json(ContextResponse { context }))
}
