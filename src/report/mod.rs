// src/report/mod.rs
pub mod catalog;
pub mod loader;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HYPHEN_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-\n(\w)").expect("Failed to compile HYPHEN_BREAK_RE"));
static TRAILING_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+\n").expect("Failed to compile TRAILING_SPACE_RE"));
static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("Failed to compile BLANK_RUN_RE"));
static SPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("Failed to compile SPACE_RUN_RE"));

/// Normalizes raw PDF-collaborator text for consistent pattern matching:
/// CR line endings, hyphenated line breaks, trailing spaces, and runs of
/// blank lines or spaces.
pub fn clean_text(text: &str) -> String {
    let text = text.replace('\r', "\n");
    let text = HYPHEN_BREAK_RE.replace_all(&text, "$1");
    let text = TRAILING_SPACE_RE.replace_all(&text, "\n");
    let text = BLANK_RUN_RE.replace_all(&text, "\n\n");
    let text = SPACE_RUN_RE.replace_all(&text, " ");
    text.trim().to_string()
}

/// One detected heading from the PDF collaborator's outline.
/// `offset` is a byte offset into the document's full text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    pub text: String,
    pub level: u32,
    pub offset: usize,
}

/// A source report (BUR/BTR/NC/NDC) with its full extracted text and an
/// optional outline. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct Document {
    pub country: String,
    pub source_doc: String, // e.g. "BUR2", "BTR1", "NC4"
    pub url: String,
    text: String,
    outline: Vec<Heading>,
}

impl Document {
    /// Builds a document from collaborator output. The outline's offsets
    /// refer to `text` exactly as passed in, so no cleaning happens here;
    /// callers without an outline should run the text through [`clean_text`]
    /// first.
    pub fn new(
        country: impl Into<String>,
        source_doc: impl Into<String>,
        url: impl Into<String>,
        text: String,
        outline: Vec<Heading>,
    ) -> Self {
        let mut outline = outline;
        // Malformed outlines occasionally arrive unsorted; matching and
        // boundary detection assume document order.
        outline.sort_by_key(|h| h.offset);
        Self {
            country: country.into(),
            source_doc: source_doc.into(),
            url: url.into(),
            text,
            outline,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn outline(&self) -> &[Heading] {
        &self.outline
    }

    pub fn has_outline(&self) -> bool {
        !self.outline.is_empty()
    }
}

/// A target section to extract: canonical name, normalized aliases for
/// outline matching, heading regexes for raw-text matching, and a
/// natural-language description used in the AI prompt.
#[derive(Debug, Clone)]
pub struct SectionSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub heading_patterns: Vec<Regex>,
    pub level: Option<u32>,
    pub description: String,
    pub bundle: String,
    pub directory: String,
}

/// Which strategy produced an extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Ai,
    Keyword,
    None,
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionMethod::Ai => write!(f, "ai"),
            ExtractionMethod::Keyword => write!(f, "keyword"),
            ExtractionMethod::None => write!(f, "none"),
        }
    }
}

/// Terminal state of one (document, section) extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    /// Non-empty text was extracted.
    Succeeded,
    /// The heading was found but the section body is empty.
    Empty,
    /// No strategy located the section.
    Failed,
}

/// Outcome of one (document, section) pair. Created exactly once per pair
/// per run and never mutated; a new attempt produces a new result.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub section: String,
    pub country: String,
    pub source_doc: String,
    pub doc_url: String,
    pub text: String,
    pub method: ExtractionMethod,
    pub status: ExtractionStatus,
    /// Rough quality indicator: 1.0 exact heading match, 0.6 fuzzy
    /// containment, 0.8 AI extraction, 0.0 not found.
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_fixes_hyphenated_breaks() {
        let raw = "institu-\ntional framework";
        assert_eq!(clean_text(raw), "institutional framework");
    }

    #[test]
    fn test_clean_text_collapses_blank_and_space_runs() {
        let raw = "Heading   one  \n\n\n\nBody  text";
        let cleaned = clean_text(raw);
        assert_eq!(cleaned, "Heading one\n\nBody text");
    }

    #[test]
    fn test_clean_text_normalizes_carriage_returns() {
        let raw = "line one\r\nline two\rline three";
        let cleaned = clean_text(raw);
        assert!(!cleaned.contains('\r'));
        assert!(cleaned.contains("line two"));
    }

    #[test]
    fn test_document_sorts_outline_by_offset() {
        let doc = Document::new(
            "Cuba",
            "BUR1",
            "file:///tmp/cuba_bur1.txt",
            "some text".to_string(),
            vec![
                Heading { text: "B".into(), level: 1, offset: 50 },
                Heading { text: "A".into(), level: 1, offset: 10 },
            ],
        );
        assert_eq!(doc.outline()[0].text, "A");
        assert_eq!(doc.outline()[1].text, "B");
    }

    #[test]
    fn test_method_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ExtractionMethod::Keyword).unwrap(),
            "\"keyword\""
        );
        assert_eq!(
            serde_json::to_string(&ExtractionMethod::None).unwrap(),
            "\"none\""
        );
    }
}
