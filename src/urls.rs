//! URL discovery in free-form text.
//!
//! [`url_candidates`] lists every distinct URL-shaped match in arbitrary
//! input. [`extract_urls`] keeps the first `max` of those and drops the ones
//! that do not parse as `http`/`https` with a host ([`is_valid_url`]), so
//! everything it returns is fetchable. Matches past the cap are ignored even
//! when an earlier one was discarded.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;
use url::Url;

/// Scheme, then a host that starts alphanumeric, then URI characters up to
/// the first whitespace, quote, or angle bracket.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://[A-Za-z0-9][A-Za-z0-9\-._~:/?#@!$&'()*+,;=%\[\]]*")
        .expect("URL pattern is a valid regex")
});

/// Trailing characters that usually belong to the sentence, not the URL.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\''];

/// Every distinct URL-shaped match in `text`, trailing punctuation trimmed,
/// in order of appearance. Matches are not validated.
pub fn url_candidates(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for m in URL_PATTERN.find_iter(text) {
        let candidate = trim_trailing(m.as_str());
        if !urls.iter().any(|u| u == candidate) {
            urls.push(candidate.to_string());
        }
    }
    urls
}

/// The well-formed URLs among the first `max` candidates.
pub fn select_valid(candidates: &[String], max: usize) -> Vec<String> {
    candidates
        .iter()
        .take(max)
        .filter(|u| {
            let ok = is_valid_url(u);
            if !ok {
                warn!(url = %u, "discarding malformed url");
            }
            ok
        })
        .cloned()
        .collect()
}

/// The well-formed URLs among the first `max` distinct matches in `text`.
pub fn extract_urls(text: &str, max: usize) -> Vec<String> {
    select_valid(&url_candidates(text), max)
}

/// True when `raw` parses with an `http`/`https` scheme and a non-empty host.
pub fn is_valid_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Host component of `raw`, lowercased, if it parses.
pub fn host_of(raw: &str) -> Option<String> {
    Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}

fn trim_trailing(mut s: &str) -> &str {
    loop {
        if let Some(stripped) = s.strip_suffix(TRAILING_PUNCTUATION) {
            s = stripped;
            continue;
        }
        // Keep balanced parentheses: `/wiki/Rust_(programming_language)`.
        if s.ends_with(')') && s.matches(')').count() > s.matches('(').count() {
            s = &s[..s.len() - 1];
            continue;
        }
        return s;
    }
}
