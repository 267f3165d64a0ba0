//! Answering collaborator: the external language model.
//!
//! The corpus manager only sees the [`AnswerModel`] trait: one request with a
//! system instruction and a user message in, one text answer (or an error)
//! out. Implementations:
//!
//! - **[`OpenAIChat`]**: `POST {base_url}/chat/completions` on any
//!   OpenAI-compatible endpoint, with retry and backoff.
//! - **[`DisabledModel`]**: always fails; used when `answer.provider = "disabled"`.
//!
//! # Credentials
//!
//! The API key is read from the environment variable named by
//! `answer.api_key_env` once, when the model is created. A missing key does
//! not fail construction; the first [`AnswerModel::complete`] call reports it.
//!
//! # Retry Strategy
//!
//! - HTTP 429 and 5xx → retry
//! - other HTTP 4xx → fail immediately
//! - network errors → retry
//! - backoff: 1s, 2s, 4s, … (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AnswerConfig;

/// One model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRequest {
    pub system: String,
    pub user: String,
}

#[async_trait]
pub trait AnswerModel: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Produce an answer for `request`.
    async fn complete(&self, request: &AnswerRequest) -> Result<String>;
}

/// Build the model selected by `config.provider`.
pub fn create_model(config: &AnswerConfig) -> Result<Arc<dyn AnswerModel>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIChat::new(config)?)),
        "disabled" => Ok(Arc::new(DisabledModel)),
        other => bail!("Unknown answer provider: {}", other),
    }
}

// ============ Disabled ============

pub struct DisabledModel;

#[async_trait]
impl AnswerModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _request: &AnswerRequest) -> Result<String> {
        bail!("answering is disabled (answer.provider = \"disabled\")")
    }
}

// ============ OpenAI-compatible chat ============

pub struct OpenAIChat {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
}

impl OpenAIChat {
    pub fn new(config: &AnswerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            warn!(
                env = %config.api_key_env,
                "no API key in environment; questions will fail until it is set"
            );
        }

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key,
            api_key_env: config.api_key_env.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    fn request_body(&self, request: &AnswerRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

#[async_trait]
impl AnswerModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &AnswerRequest) -> Result<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("{} environment variable not set", self.api_key_env);
        };

        let body = self.request_body(request);
        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            debug!(model = %self.model, attempt, "requesting answer");
            let resp = self
                .client
                .post(&self.endpoint)
                .header("Authorization", format!("Bearer {}", api_key))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_chat_response(&json);
                    }

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow::anyhow!(
                            "model API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("model API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("model request failed after retries")))
    }
}

/// Extract `choices[0].message.content`.
fn parse_chat_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|t| t.as_str())
        .map(|t| t.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid model response: missing choices[0].message.content"))
}
