//! Page retrieval over HTTP.
//!
//! The [`PageSource`] trait is the seam between the corpus manager and the
//! network; [`HttpFetcher`] is the production implementation. It sends
//! browser-like headers, bounds every request with the configured timeout,
//! and treats any non-2xx status as a failure. Bodies are read in chunks and
//! cut off at `fetch.max_body_bytes`.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::FetchConfig;

/// Why a single page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out after {0}s")]
    Timeout(u64),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("could not read response body: {0}")]
    Body(String),
}

/// Anything that can turn a URL into raw HTML.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed [`PageSource`].
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Build a client from `[fetch]` settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured header value is not valid ASCII
    /// or the TLS backend fails to initialize.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_str(&config.accept)?);
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)?,
        );

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            timeout_secs: config.timeout_secs,
            max_body_bytes: config.max_body_bytes,
        })
    }
}

impl HttpFetcher {
    /// Read at most `max_body_bytes`, decoding lossily as UTF-8. Anything
    /// past the limit is dropped, not treated as an error.
    async fn read_body(&self, mut response: reqwest::Response) -> Result<String, FetchError> {
        let mut buf: Vec<u8> = Vec::new();
        loop {
            let chunk = response.chunk().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(self.timeout_secs)
                } else {
                    FetchError::Body(e.to_string())
                }
            })?;
            let Some(chunk) = chunk else {
                break;
            };
            let remaining = self.max_body_bytes.saturating_sub(buf.len());
            buf.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            if buf.len() >= self.max_body_bytes {
                warn!(limit = self.max_body_bytes, "response body truncated");
                break;
            }
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "fetching page");

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout_secs)
            } else {
                FetchError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = self.read_body(response).await?;

        debug!(url, bytes = html.len(), "fetched page");
        Ok(html)
    }
}
