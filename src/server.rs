//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/documents` | Current and archived files per type |
//! | `GET`  | `/documents/{type}` | Configuration and status for one type |
//! | `POST` | `/documents/{type}` | Store a new version from `{"path": "..."}` and rebuild the index in the background |
//! | `POST` | `/refresh` | Rebuild the index |
//! | `POST` | `/search` | Ranked chunks for `{"query": "..."}` |
//! | `POST` | `/answer` | Answer `{"question", "history", "situation"}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "unknown document type: brochure" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `embeddings_disabled` (400),
//! `internal` (500). `POST /answer` always returns 200; a failed pipeline
//! yields the fallback reply with no sources.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser chat front
//! end can call the API directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use tender_harness_core::models::{DocType, SituationalFacts, Turn};
use tender_harness_core::search::ScoredCandidate;
use tender_harness_core::Error;

use crate::assistant::{Answer, Assistant, IndexStats};
use crate::config::Config;
use crate::versions::{DocumentInfo, DocumentVersions};

/// Start the server on `[server].bind` and run until the process exits.
///
/// An initial index build is attempted; if it fails the server still
/// starts and the index is built on the first query.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let assistant = Arc::new(Assistant::new(config.clone())?);

    if let Err(e) = assistant.refresh_index().await {
        tracing::warn!(error = %format!("{:#}", e), "initial index build failed");
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(bind = %bind_addr, "tender server listening");
    axum::serve(listener, router(assistant)).await?;

    Ok(())
}

/// The API routes over a shared assistant.
pub fn router(assistant: Arc<Assistant>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/documents", get(handle_list_documents))
        .route(
            "/documents/{doc_type}",
            get(handle_document_info).post(handle_update_document),
        )
        .route("/refresh", post(handle_refresh))
        .route("/search", post(handle_search))
        .route("/answer", post(handle_answer))
        .layer(cors)
        .with_state(assistant)
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

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::UnknownDocumentType(_) => not_found(err.to_string()),
            Error::SourceFileMissing(_) | Error::Extraction { .. } => bad_request(err.to_string()),
            _ => internal(err.to_string()),
        }
    }
}

/// Pipeline errors surface through `anyhow`; a disabled embedding backend
/// is a configuration problem on the caller's side.
fn classify_pipeline_error(err: anyhow::Error) -> AppError {
    let message = format!("{:#}", err);
    if message.contains("Embedding provider is disabled") {
        AppError {
            status: StatusCode::BAD_REQUEST,
            code: "embeddings_disabled",
            message,
        }
    } else {
        internal(message)
    }
}

fn parse_doc_type(raw: &str) -> Result<DocType, AppError> {
    raw.parse::<DocType>().map_err(AppError::from)
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

// ============ /documents ============

async fn handle_list_documents(
    State(assistant): State<Arc<Assistant>>,
) -> Result<Json<BTreeMap<DocType, DocumentVersions>>, AppError> {
    Ok(Json(assistant.store().list_documents()?))
}

async fn handle_document_info(
    State(assistant): State<Arc<Assistant>>,
    Path(doc_type): Path<String>,
) -> Result<Json<DocumentInfo>, AppError> {
    let doc_type = parse_doc_type(&doc_type)?;
    Ok(Json(assistant.store().get_document_info(doc_type)?))
}

#[derive(Deserialize)]
struct UpdateRequest {
    path: PathBuf,
}

#[derive(Serialize)]
struct UpdateResponse {
    #[serde(rename = "type")]
    doc_type: DocType,
    current_file: Option<PathBuf>,
    date: Option<String>,
    bytes: usize,
}

async fn handle_update_document(
    State(assistant): State<Arc<Assistant>>,
    Path(doc_type): Path<String>,
    Json(req): Json<UpdateRequest>,
) -> Result<Json<UpdateResponse>, AppError> {
    let doc_type = parse_doc_type(&doc_type)?;
    let processed = assistant.update_document(doc_type, &req.path).await?;

    // Rebuild in the background; queries keep the previous index meanwhile.
    let refresher = Arc::clone(&assistant);
    tokio::spawn(async move {
        if let Err(e) = refresher.refresh_index().await {
            tracing::warn!(error = %format!("{:#}", e), "index refresh after update failed");
        }
    });

    Ok(Json(UpdateResponse {
        doc_type,
        current_file: assistant.get_current_file(doc_type),
        date: processed.metadata.date,
        bytes: processed.content.len(),
    }))
}

// ============ POST /refresh ============

async fn handle_refresh(
    State(assistant): State<Arc<Assistant>>,
) -> Result<Json<IndexStats>, AppError> {
    assistant
        .refresh_index()
        .await
        .map(Json)
        .map_err(classify_pipeline_error)
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<ScoredCandidate>,
}

async fn handle_search(
    State(assistant): State<Arc<Assistant>>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let results = assistant
        .search(&req.query)
        .await
        .map_err(classify_pipeline_error)?;
    Ok(Json(SearchResponse { results }))
}

// ============ POST /answer ============

#[derive(Deserialize)]
struct AnswerRequest {
    question: String,
    #[serde(default)]
    history: Vec<Turn>,
    #[serde(default)]
    situation: Option<SituationalFacts>,
}

async fn handle_answer(
    State(assistant): State<Arc<Assistant>>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<Answer>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let answer = assistant
        .answer(&req.question, &req.history, req.situation.as_ref())
        .await;
    Ok(Json(answer))
}
