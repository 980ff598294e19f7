// src/report/loader.rs
//
// Loads documents produced by the external PDF-text-extraction collaborator:
// a `<stem>.txt` full-text file plus an optional `<stem>.outline.json` with
// the detected headings. This module never touches PDF binary data.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::report::{clean_text, Document, Heading};
use crate::utils::error::DocumentError;

static DOC_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| {
        // Separator-delimited so "France" never matches NC, single digit so a
        // trailing year like _2021 is not taken as the report number
        Regex::new(r"(?i)(?:^|[\s_\-])(BUR|BTR|NDC|NC)\s?(\d?)(?:[\s_\-.]|$)")
            .expect("Failed to compile DOC_TYPE_RE")
    });
static NUMERIC_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+(\.\d+)*$").expect("Failed to compile NUMERIC_TOKEN_RE"));

// Filename tokens that are metadata, not country names
const METADATA_TOKENS: &[&str] = &[
    "GEF", "GEF8", "PIF", "PFD", "DRAFT", "FINAL", "REV", "V1", "V2", "V3",
    "BUR", "BUR1", "BUR2", "BUR3", "BTR", "BTR1", "BTR2", "NDC", "NC", "NC1",
    "NC2", "NC3", "NC4",
];

/// Loads one document. A missing or unreadable text file is fatal for that
/// document's batch; a missing outline file just means the keyword path will
/// scan raw text, and that text gets normalized up front so heading patterns
/// behave consistently.
pub fn load_document(
    text_path: &Path,
    country: Option<&str>,
    url: Option<&str>,
) -> Result<Document, DocumentError> {
    tracing::info!("Loading document text from {}", text_path.display());
    let raw_text = fs::read_to_string(text_path)?;

    let outline_path = outline_path_for(text_path);
    let outline = if outline_path.exists() {
        let outline_raw = fs::read_to_string(&outline_path)?;
        let outline: Vec<Heading> = serde_json::from_str(&outline_raw).map_err(|e| {
            DocumentError::OutlineParse(outline_path.display().to_string(), e.to_string())
        })?;
        tracing::debug!(
            "Loaded outline with {} headings from {}",
            outline.len(),
            outline_path.display()
        );
        outline
    } else {
        tracing::debug!("No outline file at {}, using raw-text matching", outline_path.display());
        Vec::new()
    };

    // The outline's offsets refer to the collaborator's text verbatim, so
    // cleaning is only safe when there is no outline to invalidate.
    let text = if outline.is_empty() { clean_text(&raw_text) } else { raw_text };

    let country = country
        .map(|c| c.to_string())
        .unwrap_or_else(|| infer_country_from_filename(text_path));
    let source_doc = infer_doc_type_from_filename(text_path);
    let url = url
        .map(|u| u.to_string())
        .unwrap_or_else(|| format!("file://{}", text_path.display()));

    Ok(Document::new(country, source_doc, url, text, outline))
}

/// Finds `.txt` document files under `input_dir`, optionally filtered to
/// filenames containing the country name (case-insensitive), sorted for
/// deterministic batch order.
pub fn find_documents(input_dir: &Path, country: Option<&str>) -> Result<Vec<PathBuf>, DocumentError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        // Outline companions are .outline.json, so the extension check
        // already excludes them
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        if let Some(country) = country {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_lowercase();
            if !stem.contains(&country.to_lowercase()) {
                continue;
            }
        }
        paths.push(path);
    }
    paths.sort();
    Ok(paths)
}

fn outline_path_for(text_path: &Path) -> PathBuf {
    let stem = text_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    text_path.with_file_name(format!("{}.outline.json", stem))
}

/// Infers a country name from a collaborator filename like
/// `Cuba_BUR1_2020.txt`: the first capitalized, non-metadata token wins.
pub fn infer_country_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let tokens: Vec<&str> = stem
        .split(|c| c == '_' || c == '-')
        .filter(|t| !t.is_empty() && !NUMERIC_TOKEN_RE.is_match(t))
        .collect();

    let country_like = tokens.iter().find(|t| {
        let first_upper = t.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
        let all_upper = t.chars().all(|c| !c.is_alphabetic() || c.is_uppercase());
        first_upper && !all_upper && !METADATA_TOKENS.contains(&t.to_uppercase().as_str())
    });
    if let Some(token) = country_like {
        return token.to_string();
    }

    let remaining: Vec<&&str> = tokens
        .iter()
        .filter(|t| !METADATA_TOKENS.contains(&t.to_uppercase().as_str()))
        .collect();
    if let Some(token) = remaining.last() {
        return token.to_string();
    }

    stem.to_string()
}

/// Infers a short doc-type identifier (BUR2, BTR1, NC4, NDC, ...) from the
/// filename; falls back to the bare stem.
pub fn infer_doc_type_from_filename(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    if let Some(caps) = DOC_TYPE_RE.captures(stem) {
        let prefix = caps[1].to_uppercase();
        let number = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        if number.is_empty() {
            // An unnumbered BUR is a first BUR by UNFCCC convention
            if prefix == "BUR" {
                return "BUR1".to_string();
            }
            return prefix;
        }
        return format!("{}{}", prefix, number);
    }

    stem.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("unfccc_extractor_loader_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_infer_country_from_filename() {
        assert_eq!(
            infer_country_from_filename(Path::new("Cuba_BUR1_2020.txt")),
            "Cuba"
        );
        assert_eq!(
            infer_country_from_filename(Path::new("GEF8_PIF_Honduras.txt")),
            "Honduras"
        );
    }

    #[test]
    fn test_infer_doc_type_from_filename() {
        assert_eq!(infer_doc_type_from_filename(Path::new("Cuba_BUR2.txt")), "BUR2");
        assert_eq!(infer_doc_type_from_filename(Path::new("Cuba_BUR.txt")), "BUR1");
        assert_eq!(infer_doc_type_from_filename(Path::new("Kenya_BTR1_2024.txt")), "BTR1");
        assert_eq!(infer_doc_type_from_filename(Path::new("Chad_NC 3.txt")), "NC3");
        assert_eq!(infer_doc_type_from_filename(Path::new("randomfile.txt")), "randomfile");
    }

    #[test]
    fn test_load_document_without_outline_cleans_text() {
        let dir = temp_dir("no_outline");
        let path = dir.join("Cuba_BUR1.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "Institu-\ntional framework   \n\n\n\nBody").unwrap();

        let doc = load_document(&path, None, None).unwrap();
        assert_eq!(doc.country, "Cuba");
        assert_eq!(doc.source_doc, "BUR1");
        assert!(doc.text().contains("Institutional framework"));
        assert!(!doc.has_outline());
        assert!(doc.url.starts_with("file://"));
    }

    #[test]
    fn test_load_document_with_outline_keeps_text_verbatim() {
        let dir = temp_dir("with_outline");
        let path = dir.join("Kenya_NC4.txt");
        std::fs::write(&path, "raw   text with   spacing").unwrap();
        std::fs::write(
            dir.join("Kenya_NC4.outline.json"),
            r#"[{"text": "Introduction", "level": 1, "offset": 0}]"#,
        )
        .unwrap();

        let doc = load_document(&path, Some("Kenya"), None).unwrap();
        // Offsets would be invalidated by cleaning, so the text is untouched
        assert_eq!(doc.text(), "raw   text with   spacing");
        assert!(doc.has_outline());
        assert_eq!(doc.outline()[0].text, "Introduction");
    }

    #[test]
    fn test_load_document_missing_file_is_error() {
        let dir = temp_dir("missing");
        let result = load_document(&dir.join("nope.txt"), None, None);
        assert!(result.is_err());
    }

    #[test]
    fn test_find_documents_filters_by_country() {
        let dir = temp_dir("find");
        std::fs::write(dir.join("Cuba_BUR1.txt"), "a").unwrap();
        std::fs::write(dir.join("Kenya_BTR1.txt"), "b").unwrap();
        std::fs::write(dir.join("notes.md"), "c").unwrap();

        let all = find_documents(&dir, None).unwrap();
        assert_eq!(all.len(), 2);

        let cuba = find_documents(&dir, Some("cuba")).unwrap();
        assert_eq!(cuba.len(), 1);
        assert!(cuba[0].to_string_lossy().contains("Cuba"));
    }
}
