//! JSON HTTP API over one shared session.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ingest` | Ingest the URLs found in `{ "text": … }` |
//! | `POST` | `/ask` | Answer `{ "question": … }` from the corpus |
//! | `POST` | `/chat` | Route `{ "input": … }` to ingest or ask, logging history |
//! | `GET`  | `/sources` | Current corpus and every URL ingested so far |
//! | `GET`  | `/history` | Conversation log |
//! | `POST` | `/reset` | Start a fresh session |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "text must not be empty" } }
//! ```
//!
//! The session lock is only taken to snapshot or swap state; fetches and
//! model calls run without it.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::corpus::{is_ingest_input, CorpusManager, Session};
use crate::models::{ConversationTurn, Role};
use crate::progress::NoProgress;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    manager: Arc<CorpusManager>,
    session: Arc<RwLock<Session>>,
}

impl AppState {
    pub fn new(manager: CorpusManager) -> Self {
        Self {
            manager: Arc::new(manager),
            session: Arc::new(RwLock::new(Session::new())),
        }
    }
}

/// Build the router; exposed separately so tests can serve it on any listener.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ingest", post(handle_ingest))
        .route("/ask", post(handle_ask))
        .route("/chat", post(handle_chat))
        .route("/sources", get(handle_sources))
        .route("/history", get(handle_history))
        .route("/reset", post(handle_reset))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `[server].bind` until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let manager = CorpusManager::from_config(config)?;
    let app = router(AppState::new(manager));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!(
        bind = %config.server.bind,
        answering = config.answer.is_enabled(),
        "server listening"
    );
    println!("wqa server listening on http://{}", config.server.bind);
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
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ Handlers ============

#[derive(Deserialize)]
struct IngestRequest {
    text: String,
}

#[derive(Serialize)]
struct IngestResponse {
    message: String,
    documents: usize,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    if req.text.trim().is_empty() {
        return Err(bad_request("text must not be empty"));
    }

    let outcome = state.manager.collect_batch(&req.text, &NoProgress).await;
    let mut session = state.session.write().await;
    let message = state.manager.apply_batch(&mut session, outcome);
    Ok(Json(IngestResponse {
        message,
        documents: session.corpus().len(),
    }))
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let corpus = state.session.read().await.corpus();
    let answer = state.manager.answer(&corpus, &req.question).await;
    Ok(Json(AskResponse { answer }))
}

#[derive(Deserialize)]
struct ChatRequest {
    input: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
}

async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let input = req.input.trim();
    if input.is_empty() {
        return Err(bad_request("input must not be empty"));
    }

    let reply = if is_ingest_input(input) {
        let outcome = state.manager.collect_batch(input, &NoProgress).await;
        let mut session = state.session.write().await;
        state.manager.apply_batch(&mut session, outcome)
    } else {
        let corpus = state.session.read().await.corpus();
        state.manager.answer(&corpus, input).await
    };

    let mut session = state.session.write().await;
    session.record(Role::User, input);
    session.record(Role::Assistant, reply.clone());
    Ok(Json(ChatResponse { reply }))
}

#[derive(Serialize)]
struct SourceEntry {
    url: String,
    title: String,
    words: usize,
}

#[derive(Serialize)]
struct SourcesResponse {
    documents: Vec<SourceEntry>,
    ingested_urls: Vec<String>,
}

async fn handle_sources(State(state): State<AppState>) -> Json<SourcesResponse> {
    let session = state.session.read().await;
    let documents = session
        .corpus()
        .documents()
        .iter()
        .map(|d| SourceEntry {
            url: d.url.clone(),
            title: d.title.clone(),
            words: d.word_count(),
        })
        .collect();
    Json(SourcesResponse {
        documents,
        ingested_urls: session.ingested_urls().iter().cloned().collect(),
    })
}

async fn handle_history(State(state): State<AppState>) -> Json<Vec<ConversationTurn>> {
    Json(state.session.read().await.history().to_vec())
}

async fn handle_reset(State(state): State<AppState>) -> Json<serde_json::Value> {
    *state.session.write().await = state.manager.reset();
    Json(serde_json::json!({ "status": "reset" }))
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
