// src/extractors/section.rs
//
// Boundary extraction and the per-document orchestrator. For every requested
// section the orchestrator tries the AI adapter first (when configured),
// falls back to heading matching, and always emits exactly one
// ExtractionResult; individual section failures never abort the batch.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ai::AiExtractor;
use crate::extractors::heading::{find_heading, HeadingMatch, MatchQuality};
use crate::report::{
    Document, ExtractionMethod, ExtractionResult, ExtractionStatus, SectionSpec,
};

// A capital-initial line of plain words reads as the next heading when no
// outline is available; sentences carry punctuation and fail this.
static NEXT_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[A-Z][A-Za-z \t]{6,}\n").expect("Failed to compile NEXT_HEADING_RE")
});

// Bare roman-numeral label on its own line directly above a heading,
// e.g. "IV.\nInstitutional framework" as some PDF extractors split it
static ROMAN_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*[ivxlcdm]+\.\s*$").expect("Failed to compile ROMAN_LABEL_RE")
});

/// Slices the matched section out of the document text.
///
/// End boundary: for outline matches, the offset of the next heading at the
/// same or a higher level; for text-scan matches, the next heading-like
/// line; document end otherwise. A malformed outline where the next heading
/// shares the matched offset yields an empty section rather than an error —
/// "present but empty" is a valid outcome distinct from "not found".
pub fn extract_span(document: &Document, start_match: &HeadingMatch) -> String {
    let text = document.text();
    let end = match start_match.outline_index {
        Some(index) => outline_end(document, index, start_match),
        None => text_end(text, start_match.heading_end),
    };

    if end <= start_match.offset {
        tracing::warn!(
            "Degenerate section span {}..{} in {}, treating as empty",
            start_match.offset,
            end,
            document.source_doc
        );
        return String::new();
    }

    // A section whose body is blank (the next heading starts right after
    // this one) is present-but-empty; the heading alone is not content.
    let body = slice_lossy(text, start_match.heading_end.min(end), end);
    if body.trim().is_empty() {
        tracing::debug!(
            "No text between '{}' heading and the next boundary in {}",
            slice_lossy(text, start_match.offset, start_match.heading_end).trim(),
            document.source_doc
        );
        return String::new();
    }

    // Include a preceding bare roman-numeral label line in the section
    let start = expand_over_roman_label(text, start_match.offset);

    slice_lossy(text, start, end).trim().to_string()
}

fn outline_end(document: &Document, matched_index: usize, start_match: &HeadingMatch) -> usize {
    let level = start_match.level.unwrap_or(u32::MAX);
    document
        .outline()
        .iter()
        .skip(matched_index + 1)
        .find(|h| h.level <= level)
        .map(|h| h.offset)
        .unwrap_or_else(|| document.text().len())
}

fn text_end(text: &str, from: usize) -> usize {
    let from = from.min(text.len());
    if !text.is_char_boundary(from) {
        return text.len();
    }
    NEXT_HEADING_RE
        .find(&text[from..])
        .map(|m| from + m.start())
        .unwrap_or(text.len())
}

fn expand_over_roman_label(text: &str, start: usize) -> usize {
    if start == 0 || start > text.len() || !text.is_char_boundary(start) {
        return start;
    }
    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);

    // Label on the same line before the heading text: "iv. Institutional ..."
    let prefix = &text[line_start..start];
    if !prefix.is_empty() {
        return if ROMAN_LABEL_RE.is_match(prefix) { line_start } else { start };
    }

    // Heading starts a line; some PDF extractors put the label alone on the
    // previous line: "IV.\nInstitutional ..."
    if line_start == 0 {
        return start;
    }
    let prev_start = text[..line_start - 1].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let prev_line = &text[prev_start..line_start - 1];
    if !prev_line.is_empty() && ROMAN_LABEL_RE.is_match(prev_line) {
        prev_start
    } else {
        start
    }
}

/// Byte slicing tolerant of offsets that land inside a multi-byte char
/// (collaborator offsets are not guaranteed to be boundary-aligned).
fn slice_lossy(text: &str, start: usize, end: usize) -> &str {
    let mut s = start.min(text.len());
    while s < text.len() && !text.is_char_boundary(s) {
        s += 1;
    }
    let mut e = end.min(text.len());
    while e > 0 && !text.is_char_boundary(e) {
        e -= 1;
    }
    if s >= e {
        ""
    } else {
        &text[s..e]
    }
}

/// Tunables passed in at construction; no process-wide state.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Allow substring containment when no heading matches exactly.
    pub fuzzy_containment: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self { fuzzy_containment: true }
    }
}

/// Per-document extraction orchestrator. The AI adapter is an injected
/// capability so tests can swap in a double with no network access.
pub struct SectionExtractor<A> {
    specs: Vec<SectionSpec>,
    ai: Option<A>,
    config: ExtractorConfig,
}

impl<A: AiExtractor> SectionExtractor<A> {
    pub fn new(specs: Vec<SectionSpec>, ai: Option<A>, config: ExtractorConfig) -> Self {
        Self { specs, ai, config }
    }

    pub fn specs(&self) -> &[SectionSpec] {
        &self.specs
    }

    /// Processes every configured section for one document; exactly one
    /// result per section, in catalog order. Keyword extraction is
    /// deterministic, so re-running without an AI key reproduces results.
    pub async fn extract_all(&self, document: &Document) -> Vec<ExtractionResult> {
        let mut results = Vec::with_capacity(self.specs.len());
        for spec in &self.specs {
            let result = self.extract_section(document, spec).await;
            tracing::info!(
                "{} / '{}': {:?} via {}",
                document.source_doc,
                spec.name,
                result.status,
                result.method
            );
            results.push(result);
        }
        results
    }

    /// State machine for one (document, section) pair:
    /// AI (if configured) -> heading match -> boundary slice.
    pub async fn extract_section(&self, document: &Document, spec: &SectionSpec) -> ExtractionResult {
        if let Some(ai) = &self.ai {
            if let Some(text) = ai.extract(document.text(), spec).await {
                let text = text.trim().to_string();
                if !text.is_empty() {
                    return self.result(document, spec, text, ExtractionMethod::Ai,
                        ExtractionStatus::Succeeded, 0.8);
                }
            }
            tracing::debug!(
                "AI extraction unavailable or empty for '{}', falling back to keyword matching",
                spec.name
            );
        }

        let heading = match find_heading(document, spec, self.config.fuzzy_containment) {
            Some(m) => m,
            None => {
                return self.result(document, spec, String::new(), ExtractionMethod::None,
                    ExtractionStatus::Failed, 0.0);
            }
        };

        let confidence = match heading.quality {
            MatchQuality::Exact => 1.0,
            MatchQuality::Fuzzy => 0.6,
        };
        let text = extract_span(document, &heading);
        let status = if text.is_empty() {
            ExtractionStatus::Empty
        } else {
            ExtractionStatus::Succeeded
        };
        self.result(document, spec, text, ExtractionMethod::Keyword, status, confidence)
    }

    fn result(
        &self,
        document: &Document,
        spec: &SectionSpec,
        text: String,
        method: ExtractionMethod,
        status: ExtractionStatus,
        confidence: f32,
    ) -> ExtractionResult {
        ExtractionResult {
            section: spec.name.clone(),
            country: document.country.clone(),
            source_doc: document.source_doc.clone(),
            doc_url: document.url.clone(),
            text,
            method,
            status,
            confidence,
        }
    }
}
