//! Core data models shared by the ingestion and answering pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Cleaned, word-capped text extracted from one web page.
///
/// Built by the normalizer after a successful fetch and never mutated
/// afterwards; the corpus owns it once ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedDocument {
    pub url: String,
    pub title: String,
    pub content: String,
}

impl ExtractedDocument {
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation log. Kept for display only.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            at: Utc::now(),
        }
    }
}
