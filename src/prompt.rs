//! Text built from the corpus: ingestion summaries, the local overview,
//! and the prompt payload for the answering model. Pure functions only.

use crate::models::ExtractedDocument;

/// System instruction sent with every model request.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that answers questions based on provided content. \
Always cite your sources using [Source X] notation when providing information. \
If the answer cannot be found in the sources, say so clearly.";

/// Summary returned after a successful ingestion batch.
pub fn ingest_summary(documents: &[ExtractedDocument], preview_chars: usize) -> String {
    let mut out = String::from("Content extracted from URLs:\n\n");
    for (i, doc) in documents.iter().enumerate() {
        out.push_str(&format!(
            "Source {}: {}\nPreview: {}\n\n",
            i + 1,
            doc.title,
            preview(&first_chars(&doc.content, preview_chars), &doc.content)
        ));
    }
    out
}

/// "What is this about" answer assembled without the model.
pub fn overview(documents: &[ExtractedDocument], preview_words: usize) -> String {
    let mut out = String::from("Here's what I found about these URLs:\n\n");
    for (i, doc) in documents.iter().enumerate() {
        out.push_str(&format!("**Source {}: {}**\n", i + 1, doc.title));
        out.push_str(&format!("URL: {}\n", doc.url));
        let head = first_words(&doc.content, preview_words);
        out.push_str(&format!("Content begins with: {}\n\n", preview(&head, &doc.content)));
    }
    out
}

/// `Source {n} ({url}):` blocks with the first `chars_per_source` characters
/// of each document, separated by a blank line.
pub fn context_payload(documents: &[ExtractedDocument], chars_per_source: usize) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "Source {} ({}):\n{}",
                i + 1,
                doc.url,
                first_chars(&doc.content, chars_per_source)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// User message wrapping the payload and the literal question.
pub fn user_message(payload: &str, question: &str) -> String {
    format!(
        "Here is the content to search through:\n\n{}\n\nQuestion: {}\n\n\
         Please answer the question using only the information provided above. \
         Cite sources as [Source X] where X is the source number.",
        payload, question
    )
}

/// True when `question` asks for a general overview. After lowercasing and
/// dropping trailing punctuation, the question must equal one of `phrases`
/// or contain one of `fragments`.
pub fn is_overview_question(question: &str, phrases: &[String], fragments: &[String]) -> bool {
    let q = question
        .trim()
        .trim_end_matches(['?', '.', '!'])
        .trim()
        .to_lowercase();
    phrases.iter().any(|p| q == p.trim().to_lowercase())
        || fragments
            .iter()
            .any(|f| !f.is_empty() && q.contains(&f.to_lowercase()))
}

/// Char-boundary safe prefix.
pub fn first_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

pub fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

fn preview(head: &str, full: &str) -> String {
    if head.len() < full.len() {
        format!("{}...", head)
    } else {
        head.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(url: &str, title: &str, content: &str) -> ExtractedDocument {
        ExtractedDocument {
            url: url.to_string(),
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn summary_numbers_sources_and_previews() {
        let long = "x".repeat(300);
        let docs = vec![
            doc("https://a.com", "Alpha", "Hello"),
            doc("https://b.com", "Beta", &long),
        ];
        let s = ingest_summary(&docs, 200);
        assert!(s.contains("Source 1: Alpha\nPreview: Hello\n"));
        assert!(s.contains(&format!("Source 2: Beta\nPreview: {}...\n", "x".repeat(200))));
    }

    #[test]
    fn payload_blocks_are_labeled_and_truncated() {
        let docs = vec![
            doc("https://a.com", "A", "alpha text"),
            doc("https://b.com", "B", &"y".repeat(1500)),
        ];
        let p = context_payload(&docs, 1000);
        let blocks: Vec<&str> = p.split("\n\n").collect();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], "Source 1 (https://a.com):\nalpha text");
        assert_eq!(
            blocks[1],
            format!("Source 2 (https://b.com):\n{}", "y".repeat(1000))
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(first_chars("héllo wörld", 7), "héllo w");
        assert_eq!(first_words("a b  c d", 3), "a b c");
    }

    #[test]
    fn overview_lists_title_url_and_opening_words() {
        let content = (0..80).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let docs = vec![doc("https://a.com", "Alpha", &content)];
        let o = overview(&docs, 50);
        assert!(o.contains("**Source 1: Alpha**"));
        assert!(o.contains("URL: https://a.com"));
        assert!(o.contains("Content begins with: w0 w1"));
        assert!(o.contains("w49..."));
        assert!(!o.contains("w50"));
    }

    #[test]
    fn overview_phrase_must_be_the_whole_question() {
        let phrases = vec!["what is this url about".to_string()];
        let fragments = vec!["what is url about".to_string()];
        assert!(is_overview_question("what is this url about", &phrases, &fragments));
        assert!(is_overview_question("  What is this URL about? ", &phrases, &fragments));
        assert!(!is_overview_question(
            "tell me what is this url about rust",
            &phrases,
            &fragments
        ));
        assert!(!is_overview_question("what is rust about?", &phrases, &fragments));
    }

    #[test]
    fn overview_fragment_matches_anywhere() {
        let phrases = vec!["what is this url about".to_string()];
        let fragments = vec!["what is url about".to_string()];
        assert!(is_overview_question("so, what is URL about", &phrases, &fragments));
        assert!(is_overview_question("tell me what is url about here", &phrases, &fragments));
        assert!(!is_overview_question("anything", &[], &[String::new()]));
    }

    #[test]
    fn user_message_carries_question_and_payload() {
        let m = user_message("Source 1 (u):\nbody", "Why?");
        assert!(m.starts_with("Here is the content to search through:\n\nSource 1 (u):\nbody"));
        assert!(m.contains("Question: Why?"));
        assert!(m.contains("[Source X]"));
    }
}
