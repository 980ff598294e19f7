// src/extractors/heading.rs
//
// Locates a target section heading inside a document, either in the
// collaborator's outline or by scanning the raw text with the catalog's
// heading patterns. Exact normalized matching is always tried first; fuzzy
// containment is a tunable fallback (see ExtractorConfig::fuzzy_containment).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::report::{Document, SectionSpec};

// Leading list/chapter numbering stripped during normalization:
// "IV. ", "3.2 ", "a) ", "Chapter 4: "
static NUMBERING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:[ivxlcdm]+|\d+(?:\.\d+)*|[a-z])[.):]?\s+|chapter\s+\d+\s*[.:]?\s*)")
        .expect("Failed to compile NUMBERING_RE")
});

/// Aliases shorter than this never participate in fuzzy containment;
/// "setup" appearing inside an unrelated heading is not a match.
pub const MIN_FUZZY_ALIAS_LEN: usize = 8;

/// How confident the matcher is in a located heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchQuality {
    /// Normalized heading equals the canonical name or an alias.
    Exact,
    /// Normalized alias and heading only contain one another.
    Fuzzy,
}

/// A located section heading. `offset` is where the section starts (byte
/// offset into the document text); `heading_end` is where the heading line
/// itself ends.
#[derive(Debug, Clone)]
pub struct HeadingMatch {
    pub offset: usize,
    pub heading_end: usize,
    pub level: Option<u32>,
    pub quality: MatchQuality,
    /// Index into the document outline when the match came from there.
    pub outline_index: Option<usize>,
}

/// Normalizes a heading candidate for comparison: case-fold, strip leading
/// numbering, drop punctuation, collapse whitespace.
pub fn normalize_heading(raw: &str) -> String {
    let stripped = NUMBERING_RE.replace(raw, "");
    let lowered = stripped.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Finds the target section's heading, or `None` when it is absent — never
/// an error, so the orchestrator can fall back further.
///
/// Tie-break: the earliest occurrence in document order wins; later matches
/// are restated mentions or continuations, not new section starts. Exact
/// matches beat fuzzy matches regardless of position.
pub fn find_heading(
    document: &Document,
    spec: &SectionSpec,
    fuzzy_containment: bool,
) -> Option<HeadingMatch> {
    if document.has_outline() {
        if let Some(m) = find_in_outline(document, spec, fuzzy_containment) {
            return Some(m);
        }
        tracing::debug!(
            "Outline has no heading for '{}', falling back to text scan",
            spec.name
        );
    }
    find_in_text(document, spec)
}

fn find_in_outline(
    document: &Document,
    spec: &SectionSpec,
    fuzzy_containment: bool,
) -> Option<HeadingMatch> {
    let targets: Vec<String> = std::iter::once(spec.name.as_str())
        .chain(spec.aliases.iter().map(|a| a.as_str()))
        .map(normalize_heading)
        .filter(|t| !t.is_empty())
        .collect();

    // Pass 1: exact normalized equality, earliest heading wins.
    for (index, heading) in document.outline().iter().enumerate() {
        let candidate = normalize_heading(&heading.text);
        if candidate.is_empty() {
            continue;
        }
        if targets.iter().any(|t| *t == candidate) {
            tracing::debug!(
                "Exact outline match for '{}' at offset {} ('{}')",
                spec.name,
                heading.offset,
                heading.text
            );
            return Some(HeadingMatch {
                offset: heading.offset,
                heading_end: heading_end(document, heading.offset),
                level: Some(heading.level),
                quality: MatchQuality::Exact,
                outline_index: Some(index),
            });
        }
    }

    if !fuzzy_containment {
        return None;
    }

    // Pass 2: containment either way, earliest heading wins.
    for (index, heading) in document.outline().iter().enumerate() {
        let candidate = normalize_heading(&heading.text);
        let contained = targets.iter().any(|t| {
            (t.len() >= MIN_FUZZY_ALIAS_LEN && candidate.contains(t.as_str()))
                || (candidate.len() >= MIN_FUZZY_ALIAS_LEN && t.contains(candidate.as_str()))
        });
        if contained {
            tracing::debug!(
                "Fuzzy outline match for '{}' at offset {} ('{}')",
                spec.name,
                heading.offset,
                heading.text
            );
            return Some(HeadingMatch {
                offset: heading.offset,
                heading_end: heading_end(document, heading.offset),
                level: Some(heading.level),
                quality: MatchQuality::Fuzzy,
                outline_index: Some(index),
            });
        }
    }

    None
}

fn find_in_text(document: &Document, spec: &SectionSpec) -> Option<HeadingMatch> {
    let text = document.text();
    let mut best: Option<regex::Match> = None;

    // Patterns are ordered most-specific first, but document order still
    // decides between them: the earliest start wins across all patterns.
    for pattern in &spec.heading_patterns {
        if let Some(m) = pattern.find(text) {
            let better = match &best {
                Some(b) => m.start() < b.start(),
                None => true,
            };
            if better {
                best = Some(m);
            }
        }
    }

    best.map(|m| {
        tracing::debug!(
            "Text-scan match for '{}' at offset {} ('{}')",
            spec.name,
            m.start(),
            m.as_str().trim()
        );
        HeadingMatch {
            offset: m.start(),
            heading_end: m.end(),
            level: None,
            quality: MatchQuality::Exact,
            outline_index: None,
        }
    })
}

/// End of the heading line for an outline match: the next newline after the
/// offset, or the offset itself when it is out of range.
fn heading_end(document: &Document, offset: usize) -> usize {
    let text = document.text();
    // Collaborator offsets are not guaranteed to be char-boundary aligned
    let mut start = offset.min(text.len());
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..]
        .find('\n')
        .map(|i| start + i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::catalog;
    use crate::report::Heading;

    fn spec_named(name: &str) -> SectionSpec {
        catalog::builtin_specs(None)
            .into_iter()
            .find(|s| s.name == name)
            .unwrap()
    }

    fn doc_with_outline(text: &str, outline: Vec<Heading>) -> Document {
        Document::new("Cuba", "BUR1", "file:///tmp/doc.txt", text.to_string(), outline)
    }

    #[test]
    fn test_normalize_strips_numbering_and_punctuation() {
        assert_eq!(
            normalize_heading("IV. Institutional Framework for Climate Action"),
            "institutional framework for climate action"
        );
        assert_eq!(
            normalize_heading("3.2  Constraints, gaps and needs:"),
            "constraints gaps and needs"
        );
        assert_eq!(normalize_heading("Chapter 4: Key Barriers"), "key barriers");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(
            normalize_heading("  National   policy\tframework "),
            "national policy framework"
        );
    }

    #[test]
    fn test_exact_outline_match_wins_over_later_duplicates() {
        let text = "x".repeat(400);
        let doc = doc_with_outline(
            &text,
            vec![
                Heading { text: "Introduction".into(), level: 1, offset: 0 },
                Heading {
                    text: "II. Institutional framework for climate action".into(),
                    level: 1,
                    offset: 100,
                },
                Heading {
                    text: "Institutional framework for climate action".into(),
                    level: 1,
                    offset: 300,
                },
            ],
        );
        let spec = spec_named("Institutional framework for climate action");
        let m = find_heading(&doc, &spec, true).unwrap();
        assert_eq!(m.offset, 100);
        assert_eq!(m.quality, MatchQuality::Exact);
        assert_eq!(m.outline_index, Some(1));
    }

    #[test]
    fn test_exact_beats_earlier_fuzzy() {
        let text = "x".repeat(400);
        let doc = doc_with_outline(
            &text,
            vec![
                // Fuzzy-containable mention comes first in document order
                Heading {
                    text: "Overview of the institutional framework arrangements in place".into(),
                    level: 1,
                    offset: 50,
                },
                Heading {
                    text: "Institutional framework".into(),
                    level: 1,
                    offset: 200,
                },
            ],
        );
        let spec = spec_named("Institutional framework for climate action");
        let m = find_heading(&doc, &spec, true).unwrap();
        assert_eq!(m.offset, 200);
        assert_eq!(m.quality, MatchQuality::Exact);
    }

    #[test]
    fn test_fuzzy_containment_can_be_disabled() {
        let text = "x".repeat(200);
        let doc = doc_with_outline(
            &text,
            vec![Heading {
                text: "National greenhouse gas inventory of energy and waste".into(),
                level: 1,
                offset: 10,
            }],
        );
        let spec = spec_named("GHG Inventory Module");
        assert!(find_heading(&doc, &spec, true).is_some());
        // Exact-only mode: the heading is a superset, not an equal
        // (text fallback also finds nothing in filler text)
        assert!(find_heading(&doc, &spec, false).is_none());
    }

    #[test]
    fn test_text_scan_when_no_outline() {
        let text = "Some intro.\nIII. National greenhouse gas inventory\nEmissions rose.";
        let doc = doc_with_outline(text, vec![]);
        let spec = spec_named("GHG Inventory Module");
        let m = find_heading(&doc, &spec, true).unwrap();
        assert_eq!(m.offset, text.find("III.").unwrap());
        assert!(m.level.is_none());
        assert!(m.outline_index.is_none());
    }

    #[test]
    fn test_text_scan_earliest_across_patterns() {
        // "Main barriers" pattern is listed after "Key barriers" in the
        // catalog but appears earlier in the document
        let text = "Main barriers to reporting\nfiller\nKey barriers\nmore";
        let doc = doc_with_outline(text, vec![]);
        let spec = spec_named("Key Barriers");
        let m = find_heading(&doc, &spec, true).unwrap();
        assert_eq!(m.offset, 0);
    }

    #[test]
    fn test_returns_none_for_absent_section() {
        let doc = doc_with_outline("Nothing relevant here at all.", vec![]);
        let spec = spec_named("Official Reporting to UNFCCC");
        assert!(find_heading(&doc, &spec, true).is_none());
    }

    #[test]
    fn test_outline_miss_falls_back_to_text() {
        let text = "preamble\nKey barriers\nbody text";
        let doc = doc_with_outline(
            text,
            vec![Heading { text: "Unrelated chapter".into(), level: 1, offset: 0 }],
        );
        let spec = spec_named("Key Barriers");
        let m = find_heading(&doc, &spec, true).unwrap();
        assert_eq!(m.offset, text.find("Key barriers").unwrap());
    }
}
