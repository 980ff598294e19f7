// src/ai/mod.rs
pub mod client;
pub mod models;

use std::future::Future;

use crate::report::SectionSpec;

pub use client::{AiConfig, OpenAiExtractor};

/// Capability interface for AI-assisted extraction, injected into the
/// orchestrator so a test double can stand in without network access.
pub trait AiExtractor {
    /// Returns the extracted section text, or `None` on any failure
    /// (network, auth, quota, malformed/empty response). Never errors.
    fn extract(
        &self,
        document_text: &str,
        spec: &SectionSpec,
    ) -> impl Future<Output = Option<String>> + Send;
}
