//! JSON API end to end: a local page server feeds the real fetcher, and a
//! stub model answers questions.

use anyhow::Result;
use async_trait::async_trait;
use axum::{response::Html, routing::get, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use web_qa::answer::{AnswerModel, AnswerRequest};
use web_qa::config::{Config, FetchConfig};
use web_qa::corpus::{CorpusManager, MSG_EMPTY_CORPUS};
use web_qa::fetch::HttpFetcher;
use web_qa::server::{router, AppState};

struct StubModel;

#[async_trait]
impl AnswerModel for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: &AnswerRequest) -> Result<String> {
        let sources = request.user.matches(" (http").count();
        Ok(format!("Answered from {} sources [Source 1].", sources))
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Returns (api base url, page server base url).
async fn start() -> (String, String) {
    let pages = Router::new()
        .route(
            "/alpha",
            get(|| async { Html("<title>Alpha</title><p>Alpha page body.</p>") }),
        )
        .route(
            "/beta",
            get(|| async { Html("<title>Beta</title><p>Beta page body.</p>") }),
        );
    let pages_addr = serve(pages).await;

    let config = Config::minimal();
    let fetcher = Arc::new(HttpFetcher::new(&FetchConfig::default()).unwrap());
    let manager = CorpusManager::new(&config, fetcher, Arc::new(StubModel));
    let api_addr = serve(router(AppState::new(manager))).await;

    (
        format!("http://{}", api_addr),
        format!("http://{}", pages_addr),
    )
}

async fn post(client: &reqwest::Client, url: String, body: Value) -> (u16, Value) {
    let resp = client.post(url).json(&body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn get_json(client: &reqwest::Client, url: String) -> Value {
    client.get(url).send().await.unwrap().json().await.unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let (api, _) = start().await;
    let body = get_json(&reqwest::Client::new(), format!("{}/health", api)).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn ingest_then_ask() {
    let (api, pages) = start().await;
    let client = reqwest::Client::new();

    let (status, body) = post(&client, format!("{}/ask", api), json!({ "question": "Anything?" })).await;
    assert_eq!(status, 200);
    assert_eq!(body["answer"], MSG_EMPTY_CORPUS);

    let text = format!("Read {}/alpha and {}/beta please", pages, pages);
    let (status, body) = post(&client, format!("{}/ingest", api), json!({ "text": text })).await;
    assert_eq!(status, 200);
    assert_eq!(body["documents"], 2);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Content extracted from URLs:"));

    let sources = get_json(&client, format!("{}/sources", api)).await;
    let docs = sources["documents"].as_array().unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(sources["ingested_urls"].as_array().unwrap().len(), 2);

    let (_, body) = post(&client, format!("{}/ask", api), json!({ "question": "What is in them?" })).await;
    assert_eq!(body["answer"], "Answered from 2 sources [Source 1].");

    let (_, body) = post(
        &client,
        format!("{}/ask", api),
        json!({ "question": "What is this URL about?" }),
    )
    .await;
    let overview = body["answer"].as_str().unwrap();
    assert!(overview.contains("**Source 1:"));
    assert!(overview.contains("Content begins with:"));
}

#[tokio::test]
async fn chat_records_history_and_reset_clears_it() {
    let (api, pages) = start().await;
    let client = reqwest::Client::new();

    let (_, body) = post(
        &client,
        format!("{}/chat", api),
        json!({ "input": format!("{}/alpha", pages) }),
    )
    .await;
    assert!(body["reply"].as_str().unwrap().contains("Source 1: Alpha"));

    let (_, body) = post(&client, format!("{}/chat", api), json!({ "input": "Summarize" })).await;
    assert_eq!(body["reply"], "Answered from 1 sources [Source 1].");

    let history = get_json(&client, format!("{}/history", api)).await;
    let turns = history.as_array().unwrap();
    assert_eq!(turns.len(), 4);
    assert_eq!(turns[0]["role"], "user");
    assert_eq!(turns[1]["role"], "assistant");
    assert_eq!(turns[2]["text"], "Summarize");

    let (status, body) = post(&client, format!("{}/reset", api), json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "reset");

    let history = get_json(&client, format!("{}/history", api)).await;
    assert!(history.as_array().unwrap().is_empty());
    let sources = get_json(&client, format!("{}/sources", api)).await;
    assert!(sources["documents"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn failed_batch_leaves_corpus_in_place() {
    let (api, pages) = start().await;
    let client = reqwest::Client::new();

    post(
        &client,
        format!("{}/ingest", api),
        json!({ "text": format!("{}/alpha", pages) }),
    )
    .await;

    let (status, body) = post(
        &client,
        format!("{}/ingest", api),
        json!({ "text": format!("{}/does-not-exist", pages) }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["documents"], 1);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("does-not-exist: fetch failed: HTTP 404"));
}

#[tokio::test]
async fn empty_input_is_a_bad_request() {
    let (api, _) = start().await;
    let client = reqwest::Client::new();

    for (path, body) in [
        ("ingest", json!({ "text": "  " })),
        ("ask", json!({ "question": "" })),
        ("chat", json!({ "input": "\n" })),
    ] {
        let (status, body) = post(&client, format!("{}/{}", api, path), body).await;
        assert_eq!(status, 400, "{}", path);
        assert_eq!(body["error"]["code"], "bad_request");
    }
}
