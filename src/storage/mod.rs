// src/storage/mod.rs
//
// Persists extraction results as per-section JSON bundles, the shape the
// downstream upload collaborator consumes. Uniqueness is enforced on
// (country, section, source_doc, doc_url); re-extracting unchanged text
// keeps the original created_utc timestamp.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::report::{ExtractionResult, ExtractionStatus, SectionSpec};
use crate::utils::error::StorageError;

/// One persisted record, matching the upload collaborator's contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub country: String,
    pub section: String,
    pub source_doc: String,
    pub doc_url: String,
    pub extracted_text: String,
    pub created_utc: String,
}

impl SectionRecord {
    /// Builds a record from a successful extraction; empty and failed
    /// results are not persisted.
    pub fn from_result(result: &ExtractionResult) -> Option<Self> {
        if result.status != ExtractionStatus::Succeeded {
            return None;
        }
        Some(Self {
            country: result.country.clone(),
            section: result.section.clone(),
            source_doc: result.source_doc.clone(),
            doc_url: result.doc_url.clone(),
            extracted_text: result.text.clone(),
            created_utc: now_utc(),
        })
    }

    fn key(&self) -> (String, String, String, String) {
        (
            self.country.clone(),
            self.section.clone(),
            self.source_doc.clone(),
            self.doc_url.clone(),
        )
    }
}

fn now_utc() -> String {
    // Second precision with a Z suffix, e.g. 2026-08-30T14:03:21Z
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Merges new records into an existing bundle. Records keep their previous
/// created_utc when the extracted text is unchanged, so timestamps reflect
/// content changes rather than re-runs. Output is sorted by
/// (country, source_doc, created_utc).
pub fn merge_records(
    existing: Vec<SectionRecord>,
    new_records: Vec<SectionRecord>,
) -> Vec<SectionRecord> {
    use std::collections::HashMap;

    let existing_lookup: HashMap<_, _> = existing
        .into_iter()
        .map(|record| (record.key(), record))
        .collect();

    let mut merged: HashMap<(String, String, String, String), SectionRecord> =
        existing_lookup.clone();
    for mut record in new_records {
        if let Some(previous) = existing_lookup.get(&record.key()) {
            if previous.extracted_text == record.extracted_text {
                record.created_utc = previous.created_utc.clone();
            }
        }
        merged.insert(record.key(), record);
    }

    let mut records: Vec<SectionRecord> = merged.into_values().collect();
    records.sort_by(|a, b| {
        (&a.country, &a.source_doc, &a.created_utc)
            .cmp(&(&b.country, &b.source_doc, &b.created_utc))
    });
    records
}

pub struct BundleStore {
    data_dir: PathBuf,
}

impl BundleStore {
    /// Creates a store rooted at `data_dir`, creating it if needed.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }
        Ok(Self { data_dir })
    }

    /// Writes one section's bundle (merged with any existing bundle on disk)
    /// plus per-document JSON files for inspection. Returns the bundle path.
    pub fn write_section(
        &self,
        spec: &SectionSpec,
        records: Vec<SectionRecord>,
    ) -> Result<PathBuf, StorageError> {
        let bundle_path = self.data_dir.join(&spec.bundle);
        let existing = self.load_bundle(&bundle_path)?;
        let merged = merge_records(existing, records.clone());

        let bundle_json = serde_json::to_string_pretty(&merged)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&bundle_path, bundle_json)?;
        tracing::info!("Wrote {} ({} records)", bundle_path.display(), merged.len());

        // Per source_doc files inside the section directory for inspection
        let section_dir = self.data_dir.join(&spec.directory);
        if !section_dir.exists() {
            fs::create_dir_all(&section_dir)?;
        }
        for record in &records {
            let filename = format!(
                "{}_{}_{}.json",
                slugify(&record.country),
                pascal_case(&record.section),
                record.source_doc
            );
            let doc_path = section_dir.join(filename);
            let doc_json = serde_json::to_string_pretty(record)
                .map_err(|e| StorageError::SerializationError(e.to_string()))?;
            fs::write(&doc_path, doc_json)?;
            tracing::debug!("Wrote {}", doc_path.display());
        }

        Ok(bundle_path)
    }

    fn load_bundle(&self, bundle_path: &Path) -> Result<Vec<SectionRecord>, StorageError> {
        if !bundle_path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(bundle_path)?;
        serde_json::from_str(&raw).map_err(|e| StorageError::SerializationError(e.to_string()))
    }
}

/// "Institutional framework for climate action" -> "InstitutionalFrameworkForClimateAction"
fn pascal_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("")
}

/// Converts a string into a safe filesystem slug.
fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_was_sep = true;
    for c in value.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    slug.trim_end_matches('_').to_string()
}
