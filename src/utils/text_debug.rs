// src/utils/text_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;
use crate::utils::error::AppError;

/// Saves the cleaned document text to a file with matched section spans
/// marked inline, so a failed or surprising extraction can be inspected.
///
/// Each span is wrapped in `>>>[label @start..end]` / `<<<[label]` markers.
pub fn save_debug_text(
    text: &str,
    filename: &Path,
    spans: &[(usize, usize, String)],
) -> Result<(), AppError> {
    let mut file = File::create(filename)?;

    let mut sorted_spans = spans.to_vec();
    sorted_spans.sort_by_key(|s| s.0); // Sort by start position

    let mut annotated = String::with_capacity(text.len() + 128 * sorted_spans.len());
    let mut last_pos = 0;

    for (start, end, label) in &sorted_spans {
        let (start, end) = (*start, *end);
        // Overlapping or out-of-range spans are skipped rather than garbling the dump
        if start < last_pos || end > text.len() || start > end {
            tracing::warn!("Skipping malformed debug span {}..{} ({})", start, end, label);
            continue;
        }
        if !text.is_char_boundary(start) || !text.is_char_boundary(end) {
            tracing::warn!("Skipping non-boundary debug span {}..{} ({})", start, end, label);
            continue;
        }

        annotated.push_str(&text[last_pos..start]);
        annotated.push_str(&format!("\n>>>[{} @{}..{}]\n", label, start, end));
        annotated.push_str(&text[start..end]);
        annotated.push_str(&format!("\n<<<[{}]\n", label));
        last_pos = end;
    }

    if last_pos < text.len() {
        annotated.push_str(&text[last_pos..]);
    }

    file.write_all(annotated.as_bytes())?;
    tracing::info!("Saved annotated debug text to {}", filename.display());
    Ok(())
}
