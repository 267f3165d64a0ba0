//! TOML configuration.
//!
//! Every section and field carries a default, so an empty file (or no file
//! at all, via [`Config::minimal`]) yields a working setup. Product limits
//! such as the per-batch URL cap and the word cap live here rather than as
//! literals in the pipeline.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub answer: AnswerConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// HTTP settings for the page fetcher.
#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept")]
    pub accept: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Bytes of a response body kept before the rest is dropped.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            concurrency: default_concurrency(),
            user_agent: default_user_agent(),
            accept: default_accept(),
            accept_language: default_accept_language(),
            max_redirects: default_max_redirects(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    15
}
fn default_concurrency() -> usize {
    5
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}
fn default_accept() -> String {
    "text/html,application/xhtml+xml,application/xml".to_string()
}
fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}
fn default_max_redirects() -> usize {
    5
}
fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

/// Limits and site rules for building the corpus.
#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    #[serde(default = "default_summary_preview_chars")]
    pub summary_preview_chars: usize,
    #[serde(default = "default_overview_preview_words")]
    pub overview_preview_words: usize,
    /// Host substrings that select the encyclopedia extraction strategy.
    #[serde(default = "default_encyclopedia_hosts")]
    pub encyclopedia_hosts: Vec<String>,
    #[serde(default = "default_encyclopedia_container_id")]
    pub encyclopedia_container_id: String,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            max_urls: default_max_urls(),
            max_words: default_max_words(),
            summary_preview_chars: default_summary_preview_chars(),
            overview_preview_words: default_overview_preview_words(),
            encyclopedia_hosts: default_encyclopedia_hosts(),
            encyclopedia_container_id: default_encyclopedia_container_id(),
        }
    }
}

fn default_max_urls() -> usize {
    5
}
fn default_max_words() -> usize {
    2000
}
fn default_summary_preview_chars() -> usize {
    200
}
fn default_overview_preview_words() -> usize {
    50
}
fn default_encyclopedia_hosts() -> Vec<String> {
    vec!["wikipedia.org".to_string()]
}
fn default_encyclopedia_container_id() -> String {
    "mw-content-text".to_string()
}

/// Settings for the answering collaborator.
#[derive(Debug, Deserialize, Clone)]
pub struct AnswerConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Name of the environment variable holding the API credential.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_answer_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Characters of each source included in the prompt payload.
    #[serde(default = "default_source_chars")]
    pub source_chars: usize,
    /// Whole questions answered with a local overview instead of a model call.
    #[serde(default = "default_overview_phrases")]
    pub overview_phrases: Vec<String>,
    /// Fragments that trigger the local overview anywhere in a question.
    #[serde(default = "default_overview_fragments")]
    pub overview_fragments: Vec<String>,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_answer_timeout(),
            max_retries: default_max_retries(),
            source_chars: default_source_chars(),
            overview_phrases: default_overview_phrases(),
            overview_fragments: default_overview_fragments(),
        }
    }
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    800
}
fn default_answer_timeout() -> u64 {
    60
}
fn default_max_retries() -> u32 {
    2
}
fn default_source_chars() -> usize {
    1000
}
fn default_overview_phrases() -> Vec<String> {
    vec!["what is this url about".to_string()]
}
fn default_overview_fragments() -> Vec<String> {
    vec!["what is url about".to_string()]
}

impl AnswerConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Defaults for every section; used when no config file is given.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    // Validate fetch
    if !(1..=120).contains(&config.fetch.timeout_secs) {
        anyhow::bail!("fetch.timeout_secs must be in [1, 120]");
    }
    if config.fetch.concurrency == 0 {
        anyhow::bail!("fetch.concurrency must be >= 1");
    }
    if config.fetch.max_body_bytes == 0 {
        anyhow::bail!("fetch.max_body_bytes must be >= 1");
    }

    // Validate corpus
    if config.corpus.max_urls == 0 {
        anyhow::bail!("corpus.max_urls must be >= 1");
    }
    if config.corpus.max_words == 0 {
        anyhow::bail!("corpus.max_words must be >= 1");
    }

    // Validate answer
    match config.answer.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown answer provider: '{}'. Must be disabled or openai.",
            other
        ),
    }
    if config.answer.source_chars == 0 {
        anyhow::bail!("answer.source_chars must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_uses_defaults() {
        let file = write_config("");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.corpus.max_urls, 5);
        assert_eq!(cfg.corpus.max_words, 2000);
        assert_eq!(cfg.fetch.timeout_secs, 15);
        assert_eq!(cfg.answer.source_chars, 1000);
        assert_eq!(cfg.corpus.encyclopedia_hosts, vec!["wikipedia.org"]);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let file = write_config("[corpus]\nmax_words = 10\n");
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.corpus.max_words, 10);
        assert_eq!(cfg.corpus.max_urls, 5);
        assert_eq!(cfg.corpus.summary_preview_chars, 200);
    }

    #[test]
    fn rejects_unknown_provider() {
        let file = write_config("[answer]\nprovider = \"mystery\"\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown answer provider"));
    }

    #[test]
    fn rejects_zero_body_limit() {
        let file = write_config("[fetch]\nmax_body_bytes = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("max_body_bytes"));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let file = write_config("[fetch]\nconcurrency = 0\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/nonexistent/wqa.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/wqa.toml"));
    }

    #[test]
    fn example_config_parses_to_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/wqa.example.toml");
        let cfg = load_config(&path).unwrap();
        assert!(cfg.answer.is_enabled());
        assert_eq!(cfg.answer.overview_phrases, vec!["what is this url about"]);
        assert_eq!(cfg.answer.overview_fragments, vec!["what is url about"]);
        assert_eq!(cfg.fetch.max_body_bytes, 2 * 1024 * 1024);
        assert_eq!(cfg.server.bind, "127.0.0.1:7341");
        assert_eq!(cfg.corpus.encyclopedia_container_id, "mw-content-text");
    }

    #[test]
    fn disabled_provider_is_accepted() {
        let file = write_config("[answer]\nprovider = \"disabled\"\n");
        let cfg = load_config(file.path()).unwrap();
        assert!(!cfg.answer.is_enabled());
    }
}
