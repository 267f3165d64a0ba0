use axum::{response::Html, routing::get, Router};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn wqa_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_wqa"))
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("wqa.toml");
    fs::write(&path, body).unwrap();
    path
}

fn disabled_config(dir: &Path) -> PathBuf {
    write_config(
        dir,
        r#"[fetch]
timeout_secs = 5
concurrency = 2

[corpus]
max_urls = 5

[answer]
provider = "disabled"
"#,
    )
}

async fn run_wqa(config: &Path, args: &[&str]) -> (String, String, bool) {
    let output = tokio::process::Command::new(wqa_binary())
        .arg("--config")
        .arg(config)
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .await
        .unwrap_or_else(|e| panic!("Failed to run wqa binary: {}", e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

async fn serve_pages() -> String {
    let app = Router::new().route(
        "/guide",
        get(|| async {
            Html("<html><head><title>Field Guide</title></head><body><header>Site</header><p>Owls hunt at night.</p><p>They eat mice.</p></body></html>")
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn run_ingests_and_answers_overview_offline() {
    let tmp = TempDir::new().unwrap();
    let config = disabled_config(tmp.path());
    let base = serve_pages().await;
    let text = format!("What does {}/guide say?", base);

    let (stdout, stderr, ok) = run_wqa(
        &config,
        &["run", &text, "--ask", "what is this url about"],
    )
    .await;

    assert!(ok, "wqa run failed: {}", stderr);
    assert!(stdout.contains("Content extracted from URLs:"));
    assert!(stdout.contains("Source 1: Field Guide"));
    assert!(stdout.contains("Preview: Owls hunt at night. They eat mice."));
    assert!(stdout.contains("Q: what is this url about"));
    assert!(stdout.contains(&format!("URL: {}/guide", base)));
    assert!(!stdout.contains("Site"));
}

#[tokio::test]
async fn run_with_disabled_model_reports_error_text() {
    let tmp = TempDir::new().unwrap();
    let config = disabled_config(tmp.path());
    let base = serve_pages().await;

    let (stdout, _, ok) = run_wqa(
        &config,
        &["run", &format!("{}/guide", base), "--ask", "What do owls eat?"],
    )
    .await;

    assert!(ok);
    assert!(stdout.contains("Error generating answer: answering is disabled"));
}

#[tokio::test]
async fn run_without_urls_prints_guidance() {
    let tmp = TempDir::new().unwrap();
    let config = disabled_config(tmp.path());

    let (stdout, _, ok) = run_wqa(&config, &["run", "just some words"]).await;

    assert!(ok);
    assert!(stdout.contains("Please provide URLs to search through for answering questions."));
}

#[tokio::test]
async fn invalid_config_fails_fast() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), "[answer]\nprovider = \"mystery\"\n");

    let (_, stderr, ok) = run_wqa(&config, &["run", "https://example.com"]).await;

    assert!(!ok);
    assert!(stderr.contains("Unknown answer provider"), "stderr: {}", stderr);
}

#[tokio::test]
async fn missing_config_file_names_the_path() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, ok) = run_wqa(&missing, &["run", "hello"]).await;

    assert!(!ok);
    assert!(stderr.contains("Failed to read config file"));
    assert!(stderr.contains("nope.toml"));
}
