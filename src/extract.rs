//! HTML to clean text.
//!
//! The [`Normalizer`] turns a raw page into an [`ExtractedDocument`]:
//!
//! 1. Parse the HTML with `scraper`.
//! 2. Drop everything under noise tags ([`NOISE_TAGS`]) before any extraction.
//! 3. Pick an [`ExtractionStrategy`] from the [`StrategyTable`] by host.
//! 4. Join the text of the selected elements with single spaces, in document order.
//! 5. [`clean_text`]: collapse whitespace, trim, strip characters outside
//!    word characters, whitespace and `.,!?-`.
//! 6. [`cap_words`] to the configured word limit.
//! 7. Title from `<title>`, or the URL when absent.
//!
//! Noise removal is done by skipping any text whose ancestor chain contains a
//! removed element, so the parsed tree is never mutated and the same input
//! always yields the same output.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::CorpusConfig;
use crate::models::ExtractedDocument;
use crate::urls::host_of;

/// Elements whose whole subtree never contributes content.
pub const NOISE_TAGS: &[&str] = &["script", "style", "nav", "footer", "header", "aside"];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s.,!?-]").expect("disallowed-chars regex"));

const DEFAULT_CONTENT: &str = "p, h1, h2, h3, h4, h5, h6, article";
const CONTAINER_CONTENT: &str = "p, h1, h2, h3, h4, h5, h6, ul, ol";
const REFERENCE_NOISE: &str = "sup.reference, table";

fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).expect("static selector is valid")
}

/// A rule set deciding which elements of a page count as content.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &str;

    /// Text of each content element, in document order. `None` means the
    /// page lacks the structure this strategy relies on.
    fn blocks(&self, document: &Html) -> Option<Vec<String>>;
}

/// Paragraphs, headings, and `<article>` elements anywhere in the page.
pub struct DefaultStrategy;

impl ExtractionStrategy for DefaultStrategy {
    fn name(&self) -> &str {
        "default"
    }

    fn blocks(&self, document: &Html) -> Option<Vec<String>> {
        let content = css(DEFAULT_CONTENT);
        Some(collect_blocks(document.select(&content), &content, None))
    }
}

/// Encyclopedia-style pages: narrow to one main container (looked up by
/// element id), drop reference markers and tables, and read paragraphs,
/// headings and lists inside it.
pub struct ContainerStrategy {
    container_id: String,
}

impl ContainerStrategy {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
        }
    }
}

impl ExtractionStrategy for ContainerStrategy {
    fn name(&self) -> &str {
        "container"
    }

    fn blocks(&self, document: &Html) -> Option<Vec<String>> {
        let with_id = css("[id]");
        let container = document
            .select(&with_id)
            .find(|el| el.value().id() == Some(self.container_id.as_str()))?;
        if is_removed(&container, None) || has_removed_ancestor(&container, None) {
            return None;
        }
        let content = css(CONTAINER_CONTENT);
        let pruned = css(REFERENCE_NOISE);
        Some(collect_blocks(
            container.select(&content),
            &content,
            Some(&pruned),
        ))
    }
}

struct SiteRule {
    host_pattern: String,
    strategy: Arc<dyn ExtractionStrategy>,
}

/// Host-matching predicates paired with strategies; first match wins and
/// the default strategy covers everything else, including pages where a
/// matched strategy does not apply.
pub struct StrategyTable {
    rules: Vec<SiteRule>,
    fallback: Arc<dyn ExtractionStrategy>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            fallback: Arc::new(DefaultStrategy),
        }
    }
}

impl StrategyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default strategy plus the container strategy for each configured
    /// encyclopedia host.
    pub fn from_config(config: &CorpusConfig) -> Self {
        let mut table = Self::new();
        let container: Arc<dyn ExtractionStrategy> =
            Arc::new(ContainerStrategy::new(&config.encyclopedia_container_id));
        for host in &config.encyclopedia_hosts {
            table.register(host, container.clone());
        }
        table
    }

    /// Use `strategy` for URLs whose host contains `host_pattern`.
    pub fn register(&mut self, host_pattern: &str, strategy: Arc<dyn ExtractionStrategy>) {
        self.rules.push(SiteRule {
            host_pattern: host_pattern.to_ascii_lowercase(),
            strategy,
        });
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn blocks_for(&self, url: &str, document: &Html) -> (String, Vec<String>) {
        if let Some(host) = host_of(url) {
            for rule in &self.rules {
                if !host.contains(&rule.host_pattern) {
                    continue;
                }
                if let Some(blocks) = rule.strategy.blocks(document) {
                    return (rule.strategy.name().to_string(), blocks);
                }
            }
        }
        (
            self.fallback.name().to_string(),
            self.fallback.blocks(document).unwrap_or_default(),
        )
    }
}

/// Raw HTML → [`ExtractedDocument`].
pub struct Normalizer {
    strategies: StrategyTable,
    max_words: usize,
}

impl Normalizer {
    pub fn new(strategies: StrategyTable, max_words: usize) -> Self {
        Self {
            strategies,
            max_words,
        }
    }

    pub fn from_config(config: &CorpusConfig) -> Self {
        Self::new(StrategyTable::from_config(config), config.max_words)
    }

    /// Extract a document from `html` fetched at `url`.
    ///
    /// Parsing is lenient, so every page yields a document. A page without
    /// readable text gets empty content.
    pub fn normalize(&self, url: &str, html: &str) -> ExtractedDocument {
        let document = Html::parse_document(html);

        let (strategy, blocks) = self.strategies.blocks_for(url, &document);
        let mut content = cap_words(&clean_text(&blocks.join(" ")), self.max_words);
        if content.trim().is_empty() {
            warn!(url, strategy = %strategy, "no readable text on page");
            content.clear();
        }

        let title = page_title(&document).unwrap_or_else(|| url.to_string());
        debug!(url, strategy = %strategy, words = content.split_whitespace().count(), "normalized page");

        ExtractedDocument {
            url: url.to_string(),
            title,
            content,
        }
    }
}

/// Collapse whitespace runs, trim, then strip characters outside
/// `\w`, whitespace and `.,!?-`.
pub fn clean_text(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    DISALLOWED.replace_all(collapsed.trim(), "").into_owned()
}

/// Keep at most `max_words` whitespace-separated words. Text already within
/// the limit is returned unchanged.
pub fn cap_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max_words {
        words[..max_words].join(" ")
    } else {
        text.to_string()
    }
}

fn page_title(document: &Html) -> Option<String> {
    let title = document.select(&css("title")).next()?;
    let text = title.text().collect::<Vec<_>>().join(" ");
    let text = WHITESPACE.replace_all(text.trim(), " ").into_owned();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn is_removed(element: &ElementRef<'_>, extra: Option<&Selector>) -> bool {
    NOISE_TAGS.contains(&element.value().name()) || extra.is_some_and(|s| s.matches(element))
}

fn has_removed_ancestor(element: &ElementRef<'_>, extra: Option<&Selector>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| is_removed(&a, extra))
}

/// Outermost matching elements only, so nested content (a `<p>` inside an
/// `<article>`) is read once.
fn collect_blocks<'a>(
    candidates: impl Iterator<Item = ElementRef<'a>>,
    content: &Selector,
    extra: Option<&Selector>,
) -> Vec<String> {
    candidates
        .filter(|el| !is_removed(el, extra) && !has_removed_ancestor(el, extra))
        .filter(|el| {
            !el.ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| content.matches(&a))
        })
        .map(|el| visible_text(&el, extra))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Text nodes under `element` that are not inside a removed subtree.
fn visible_text(element: &ElementRef<'_>, extra: Option<&Selector>) -> String {
    let root = element.id();
    let mut parts: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|a| a.id() != root)
            .filter_map(ElementRef::wrap)
            .any(|a| is_removed(&a, extra));
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.join(" ")
}
