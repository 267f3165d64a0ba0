//! Corpus management: ingestion batches, answering, and session state.
//!
//! All mutable state lives in an explicit [`Session`] value (current corpus,
//! every URL ever ingested, conversation log). [`CorpusManager`] holds the
//! collaborators (page source, normalizer, answer model) and operates on a
//! session passed in by the caller.
//!
//! An ingestion batch is split in two so callers that share a session
//! behind a lock never hold it across network I/O:
//!
//! ```text
//! collect_batch(text) ──▶ BatchOutcome ──▶ apply_batch(&mut Session)
//!   (fetch + normalize,                     (atomic corpus swap,
//!    no session access)                       summary message)
//! ```
//!
//! Every URL yields a [`UrlOutcome`]; one failure never aborts the batch.
//! Fetches run concurrently up to `fetch.concurrency`, and the corpus keeps
//! completion order.

use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::answer::{create_model, AnswerModel, AnswerRequest};
use crate::config::{AnswerConfig, Config, CorpusConfig};
use crate::extract::Normalizer;
use crate::fetch::{FetchError, HttpFetcher, PageSource};
use crate::models::{ConversationTurn, ExtractedDocument, Role};
use crate::progress::{IngestProgressEvent, ProgressReporter};
use crate::prompt;
use crate::urls::{select_valid, url_candidates};

pub const MSG_NO_URLS: &str = "Please provide URLs to search through for answering questions.";
pub const MSG_NO_VALID_URLS: &str = "No valid URLs found. Please provide valid URLs that include both scheme (http/https) and domain.";
pub const MSG_NOTHING_EXTRACTED: &str = "Could not extract content from any of the provided URLs. Please check that the URLs are accessible.";
pub const MSG_EMPTY_CORPUS: &str =
    "Please provide URLs first so I can search for answers to your questions.";

/// Inputs mentioning `http` (any case) are ingestion batches; everything
/// else is a question.
pub fn is_ingest_input(input: &str) -> bool {
    input.to_lowercase().contains("http")
}

/// Immutable, cheaply cloned snapshot of the ingested documents.
///
/// A session swaps in a whole new `Corpus` on every successful batch, so a
/// reader holding a snapshot never sees a partial replacement.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Arc<Vec<ExtractedDocument>>,
}

impl Corpus {
    pub fn new(documents: Vec<ExtractedDocument>) -> Self {
        Self {
            documents: Arc::new(documents),
        }
    }

    pub fn documents(&self) -> &[ExtractedDocument] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Per-process conversational state.
#[derive(Debug, Default)]
pub struct Session {
    corpus: Corpus,
    ingested: BTreeSet<String>,
    history: Vec<ConversationTurn>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh session: empty corpus, no ingested URLs, no history.
    pub fn reset() -> Self {
        Self::new()
    }

    pub fn corpus(&self) -> Corpus {
        self.corpus.clone()
    }

    /// Every URL successfully ingested since the session began.
    pub fn ingested_urls(&self) -> &BTreeSet<String> {
        &self.ingested
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn record(&mut self, role: Role, text: impl Into<String>) {
        self.history.push(ConversationTurn::new(role, text));
    }

    fn replace_corpus(&mut self, documents: Vec<ExtractedDocument>) {
        self.ingested
            .extend(documents.iter().map(|d| d.url.clone()));
        self.corpus = Corpus::new(documents);
    }
}

/// Why one URL produced no document.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
}

/// Result of processing a single URL.
#[derive(Debug)]
pub struct UrlOutcome {
    pub url: String,
    pub result: Result<ExtractedDocument, PipelineError>,
}

/// Everything an ingestion batch produced, before it touches a session.
#[derive(Debug)]
pub enum BatchOutcome {
    /// The input contained no URL at all.
    NoUrls,
    /// URLs were found but none had both a scheme and a host.
    NoValidUrls { candidates: Vec<String> },
    /// Every valid URL was attempted; outcomes are in completion order.
    Processed { outcomes: Vec<UrlOutcome> },
}

impl BatchOutcome {
    /// Documents that were extracted successfully.
    pub fn documents(&self) -> Vec<&ExtractedDocument> {
        match self {
            BatchOutcome::Processed { outcomes } => {
                outcomes.iter().filter_map(|o| o.result.as_ref().ok()).collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Fetch/normalize/answer orchestration over a [`Session`].
pub struct CorpusManager {
    source: Arc<dyn PageSource>,
    normalizer: Normalizer,
    model: Arc<dyn AnswerModel>,
    corpus_config: CorpusConfig,
    answer_config: AnswerConfig,
    concurrency: usize,
}

impl CorpusManager {
    pub fn new(config: &Config, source: Arc<dyn PageSource>, model: Arc<dyn AnswerModel>) -> Self {
        Self {
            source,
            normalizer: Normalizer::from_config(&config.corpus),
            model,
            corpus_config: config.corpus.clone(),
            answer_config: config.answer.clone(),
            concurrency: config.fetch.concurrency.max(1),
        }
    }

    /// Production wiring: HTTP fetcher and the configured answer model.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = Arc::new(HttpFetcher::new(&config.fetch)?);
        let model = create_model(&config.answer)?;
        Ok(Self::new(config, source, model))
    }

    /// Replace the normalizer (e.g. to register extra site rules).
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// A fresh, empty session.
    pub fn reset(&self) -> Session {
        Session::reset()
    }

    /// Find, validate, fetch and normalize the URLs in `raw_text`.
    ///
    /// Does not touch any session. Emits one `Fetched` progress event per
    /// resolved URL.
    pub async fn collect_batch(
        &self,
        raw_text: &str,
        progress: &dyn ProgressReporter,
    ) -> BatchOutcome {
        let candidates = url_candidates(raw_text);
        if candidates.is_empty() {
            return BatchOutcome::NoUrls;
        }

        let valid = select_valid(&candidates, self.corpus_config.max_urls);
        if valid.is_empty() {
            return BatchOutcome::NoValidUrls { candidates };
        }

        let total = valid.len() as u64;
        progress.report(IngestProgressEvent::Started { total });

        let mut completed = 0u64;
        let mut outcomes = Vec::with_capacity(valid.len());
        let mut pending = stream::iter(valid.into_iter().map(|url| self.process_url(url)))
            .buffer_unordered(self.concurrency);

        while let Some(outcome) = pending.next().await {
            completed += 1;
            match &outcome.result {
                Ok(doc) => info!(url = %outcome.url, words = doc.word_count(), "extracted"),
                Err(e) => warn!(url = %outcome.url, error = %e, "skipping url"),
            }
            progress.report(IngestProgressEvent::Fetched {
                url: outcome.url.clone(),
                completed,
                total,
                ok: outcome.result.is_ok(),
            });
            outcomes.push(outcome);
        }

        BatchOutcome::Processed { outcomes }
    }

    async fn process_url(&self, url: String) -> UrlOutcome {
        let result = self
            .source
            .fetch(&url)
            .await
            .map(|html| self.normalizer.normalize(&url, &html))
            .map_err(PipelineError::from);
        UrlOutcome { url, result }
    }

    /// Fold a batch into `session` and describe the result.
    ///
    /// The corpus is replaced wholesale only when at least one document was
    /// extracted; otherwise the session is left untouched.
    pub fn apply_batch(&self, session: &mut Session, outcome: BatchOutcome) -> String {
        let outcomes = match outcome {
            BatchOutcome::NoUrls => return MSG_NO_URLS.to_string(),
            BatchOutcome::NoValidUrls { .. } => return MSG_NO_VALID_URLS.to_string(),
            BatchOutcome::Processed { outcomes } => outcomes,
        };

        let mut documents = Vec::new();
        let mut failures = Vec::new();
        for o in outcomes {
            match o.result {
                Ok(doc) => documents.push(doc),
                Err(e) => failures.push(format!("{}: {}", o.url, e)),
            }
        }

        let mut message = if documents.is_empty() {
            MSG_NOTHING_EXTRACTED.to_string()
        } else {
            let summary =
                prompt::ingest_summary(&documents, self.corpus_config.summary_preview_chars);
            session.replace_corpus(documents);
            summary
        };

        if !failures.is_empty() {
            message.push_str(if message.ends_with("\n\n") { "" } else { "\n\n" });
            message.push_str("Skipped:\n");
            for f in &failures {
                message.push_str(&format!("- {}\n", f));
            }
        }
        message
    }

    /// `collect_batch` followed by `apply_batch`.
    pub async fn ingest_batch(
        &self,
        session: &mut Session,
        raw_text: &str,
        progress: &dyn ProgressReporter,
    ) -> String {
        let outcome = self.collect_batch(raw_text, progress).await;
        self.apply_batch(session, outcome)
    }

    /// Answer `question` from `corpus`.
    ///
    /// Never calls the model for an empty corpus or an overview question.
    /// Model failures come back as an error string, not an `Err`.
    pub async fn answer(&self, corpus: &Corpus, question: &str) -> String {
        if corpus.is_empty() {
            return MSG_EMPTY_CORPUS.to_string();
        }

        if prompt::is_overview_question(
            question,
            &self.answer_config.overview_phrases,
            &self.answer_config.overview_fragments,
        ) {
            return prompt::overview(
                corpus.documents(),
                self.corpus_config.overview_preview_words,
            );
        }

        let payload = prompt::context_payload(corpus.documents(), self.answer_config.source_chars);
        let request = AnswerRequest {
            system: prompt::SYSTEM_INSTRUCTION.to_string(),
            user: prompt::user_message(&payload, question),
        };

        match self.model.complete(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(model = self.model.model_name(), error = %e, "answer failed");
                format!("Error generating answer: {}", e)
            }
        }
    }

    /// Route one free-form input: text mentioning `http` is an ingestion
    /// batch, anything else is a question. Both sides are logged to the
    /// session history.
    pub async fn respond(
        &self,
        session: &mut Session,
        input: &str,
        progress: &dyn ProgressReporter,
    ) -> String {
        let reply = if is_ingest_input(input) {
            self.ingest_batch(session, input, progress).await
        } else {
            let corpus = session.corpus();
            self.answer(&corpus, input).await
        };
        session.record(Role::User, input);
        session.record(Role::Assistant, reply.clone());
        reply
    }
}
