// src/main.rs
mod ai;
mod extractors;
mod report;
mod storage;
mod utils;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;

use ai::{AiConfig, OpenAiExtractor};
use extractors::section::{ExtractorConfig, SectionExtractor};
use report::{catalog, loader, ExtractionStatus};
use storage::{BundleStore, SectionRecord};
use utils::AppError;

/// Command Line Interface for the UNFCCC report section extractor
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Country name (used to filter input files and bias heading patterns)
    #[arg(short, long)]
    country: Option<String>,

    /// Section names to extract (default: all catalog sections)
    #[arg(short, long, num_args = 1..)]
    sections: Vec<String>,

    /// Directory containing <doc>.txt files (plus optional <doc>.outline.json)
    #[arg(short, long, default_value = "./input")]
    input_dir: String,

    /// Output directory for section bundles
    #[arg(short, long, default_value = "./data")]
    output_dir: String,

    /// Completion API model to use when an API key is configured
    #[arg(long, default_value = "gpt-4o-mini")]
    model: String,

    /// Timeout for completion API requests, in seconds
    #[arg(long, default_value = "60")]
    timeout_secs: u64,

    /// Disable fuzzy heading containment (exact normalized matches only)
    #[arg(long)]
    exact_only: bool,

    /// Debug mode - save annotated text files showing matched spans
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting processing for args: {:?}", args);

    // 3. Build the section specs for this run
    let specs = catalog::builtin_specs(args.country.as_deref());
    let specs = catalog::select_specs(specs, &args.sections);
    if specs.is_empty() {
        return Err(AppError::Config(
            "No known sections selected; check --sections spelling".to_string(),
        ));
    }

    // 4. Configure the AI adapter when a key is available
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty());
    let ai = match &api_key {
        Some(key) => {
            tracing::info!("OPENAI_API_KEY set, AI extraction enabled (model {})", args.model);
            let config = AiConfig::new(key.trim())
                .with_model(&args.model)
                .with_timeout(Duration::from_secs(args.timeout_secs));
            Some(OpenAiExtractor::new(config)?)
        }
        None => {
            tracing::info!("No OPENAI_API_KEY set, using keyword extraction only");
            None
        }
    };

    let extractor = SectionExtractor::new(
        specs,
        ai,
        ExtractorConfig { fuzzy_containment: !args.exact_only },
    );

    // 5. Initialize storage
    let store = BundleStore::new(&args.output_dir)?;

    // 6. Find input documents
    let input_dir = Path::new(&args.input_dir);
    let doc_paths = loader::find_documents(input_dir, args.country.as_deref())?;
    tracing::info!("Found {} document(s) in {}", doc_paths.len(), input_dir.display());
    if doc_paths.is_empty() {
        return Err(AppError::Config(format!(
            "No .txt documents found in {} for the requested country",
            input_dir.display()
        )));
    }

    // 7. Process each document; one record per successful section
    let mut records_by_section: HashMap<String, Vec<SectionRecord>> = HashMap::new();
    let mut success_count = 0;
    let mut failure_count = 0;

    for path in &doc_paths {
        let document = match loader::load_document(path, args.country.as_deref(), None) {
            Ok(doc) => doc,
            Err(e) => {
                // Unreadable input is fatal for this document's whole batch
                tracing::error!("Skipping {}: {}", path.display(), e);
                failure_count += 1;
                continue;
            }
        };

        tracing::info!(
            "Processing {} ({}, {} bytes, outline: {})",
            document.source_doc,
            document.country,
            document.text().len(),
            document.has_outline()
        );

        let results = extractor.extract_all(&document).await;

        if args.debug {
            if let Err(e) = write_debug_dump(&document, &extractor, path, &args.output_dir) {
                tracing::warn!("Failed to write debug dump for {}: {}", path.display(), e);
            }
        }

        for result in &results {
            match result.status {
                ExtractionStatus::Succeeded => success_count += 1,
                ExtractionStatus::Empty => {
                    tracing::warn!(
                        "Section '{}' present but empty in {}",
                        result.section,
                        document.source_doc
                    );
                }
                ExtractionStatus::Failed => {
                    tracing::warn!(
                        "Section '{}' not found in {}",
                        result.section,
                        document.source_doc
                    );
                    failure_count += 1;
                }
            }
            if let Some(record) = SectionRecord::from_result(result) {
                records_by_section.entry(result.section.clone()).or_default().push(record);
            }
        }
    }

    // 8. Persist bundles, one per section, in catalog order
    for spec in extractor.specs() {
        let records = records_by_section.remove(&spec.name).unwrap_or_default();
        if records.is_empty() {
            continue;
        }
        match store.write_section(spec, records) {
            Ok(path) => tracing::info!("Saved bundle: {}", path.display()),
            Err(e) => tracing::error!("Failed to save bundle for '{}': {}", spec.name, e),
        }
    }

    tracing::info!("Processing finished. Success: {}, Failures: {}", success_count, failure_count);

    if success_count == 0 && failure_count > 0 {
        return Err(AppError::Processing(format!(
            "Failed to extract any sections across {} attempt(s)",
            failure_count
        )));
    }

    Ok(())
}

/// Writes the document text annotated with every located heading span, next
/// to the bundles under `<output_dir>/debug/`.
fn write_debug_dump(
    document: &report::Document,
    extractor: &SectionExtractor<OpenAiExtractor>,
    source_path: &Path,
    output_dir: &str,
) -> Result<(), AppError> {
    let mut spans = Vec::new();
    for spec in extractor.specs() {
        if let Some(m) = extractors::heading::find_heading(document, spec, true) {
            spans.push((m.offset, m.heading_end, spec.name.clone()));
        }
    }

    let debug_dir = PathBuf::from(output_dir).join("debug");
    std::fs::create_dir_all(&debug_dir)?;
    let stem = source_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let debug_path = debug_dir.join(format!("{}_annotated.txt", stem));
    utils::text_debug::save_debug_text(document.text(), &debug_path, &spans)
}
