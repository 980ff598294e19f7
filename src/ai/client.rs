// src/ai/client.rs
//
// Completion-API adapter. Every failure mode (network, auth, rate limit,
// malformed or empty response) is soft: `extract` returns None and the
// orchestrator falls back to keyword matching. No internal retries.

use std::future::Future;
use std::time::Duration;

use crate::ai::models::{ChatMessage, ChatRequest, ChatResponse};
use crate::ai::AiExtractor;
use crate::report::SectionSpec;
use crate::utils::error::AiError;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

// Documents longer than this are truncated before prompting; the tail is
// replaced with a marker so the model knows text is missing.
const MAX_EXCERPT_CHARS: usize = 150_000;
const TRUNCATION_MARKER: &str = "\n[... text truncated ...]";

/// Adapter configuration, passed in explicitly at construction.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

impl AiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct OpenAiExtractor {
    client: reqwest::Client,
    config: AiConfig,
}

impl OpenAiExtractor {
    pub fn new(config: AiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    /// One request per (document, section) pair; the typed error is logged
    /// by the trait impl and never crosses the orchestrator boundary.
    async fn request_section(
        &self,
        document_text: &str,
        spec: &SectionSpec,
    ) -> Result<String, AiError> {
        let excerpt = truncate_excerpt(document_text);
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(
                    "You are an expert document analyst that extracts comprehensive, \
                     detailed information from climate documents. Return only the \
                     extracted section text, no commentary.",
                ),
                ChatMessage::user(build_prompt(&excerpt, spec)),
            ],
            temperature: 0.3,
            max_tokens: 16000,
        };

        tracing::debug!(
            "Requesting AI extraction for '{}' ({} excerpt chars)",
            spec.name,
            excerpt.len()
        );

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?; // Propagates reqwest::Error (incl. timeout) as AiError::Network

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Completion API returned {} for '{}'", status, spec.name);
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(AiError::RateLimited);
            }
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(AiError::Unauthorized);
            }
            return Err(AiError::Http(status));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::Parse(e.to_string()))?;

        let content = parsed
            .first_content()
            .map(strip_code_fences)
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}

impl AiExtractor for OpenAiExtractor {
    fn extract(
        &self,
        document_text: &str,
        spec: &SectionSpec,
    ) -> impl Future<Output = Option<String>> + Send {
        async move {
            match self.request_section(document_text, spec).await {
                Ok(text) => Some(text),
                Err(e) => {
                    // Soft failure: the orchestrator falls back to keyword matching
                    tracing::warn!("AI extraction failed for '{}': {}", spec.name, e);
                    None
                }
            }
        }
    }
}

fn build_prompt(excerpt: &str, spec: &SectionSpec) -> String {
    format!(
        "Extract ALL text relevant to the section \"{name}\" from the climate \
         report below.\n\n\
         Section guidance:\n{description}\n\n\
         Be inclusive and comprehensive: include content that directly matches \
         the section as well as thematically related policies, measures, data \
         and discussions, and look beyond explicit headings. If the document \
         truly contains nothing relevant, return an empty response.\n\n\
         --- Document to Analyze ---\n{excerpt}",
        name = spec.name,
        description = spec.description,
        excerpt = excerpt,
    )
}

/// Bounds the prompt to the model's context budget, cutting on a char
/// boundary and appending a truncation marker.
fn truncate_excerpt(text: &str) -> String {
    if text.len() <= MAX_EXCERPT_CHARS {
        return text.to_string();
    }
    let mut cut = MAX_EXCERPT_CHARS;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut excerpt = text[..cut].to_string();
    excerpt.push_str(TRUNCATION_MARKER);
    excerpt
}

/// Models sometimes wrap the answer in a markdown code fence despite the
/// instructions; unwrap it before use.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if let Some(inner) = trimmed.strip_prefix("```") {
        // Drop an optional language tag on the opening fence
        let inner = inner.strip_prefix("text").or_else(|| inner.strip_prefix("json")).unwrap_or(inner);
        if let Some(body) = inner.strip_suffix("```") {
            return body.trim();
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::catalog;

    #[test]
    fn test_truncate_excerpt_bounds_length() {
        let text = "a".repeat(MAX_EXCERPT_CHARS + 500);
        let excerpt = truncate_excerpt(&text);
        assert!(excerpt.len() <= MAX_EXCERPT_CHARS + TRUNCATION_MARKER.len());
        assert!(excerpt.ends_with(TRUNCATION_MARKER));

        let short = "short document";
        assert_eq!(truncate_excerpt(short), short);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        // Multi-byte chars straddling the cut point must not panic
        let text = "é".repeat(MAX_EXCERPT_CHARS); // 2 bytes each
        let excerpt = truncate_excerpt(&text);
        assert!(excerpt.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_prompt_names_section_and_embeds_excerpt() {
        let spec = catalog::builtin_specs(None)
            .into_iter()
            .find(|s| s.name == "Key Barriers")
            .unwrap();
        let prompt = build_prompt("Document body.", &spec);
        assert!(prompt.contains("\"Key Barriers\""));
        assert!(prompt.contains(&spec.description));
        assert!(prompt.contains("Document body."));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```text\nBody here\n```"), "Body here");
        assert_eq!(strip_code_fences("```\nBody here\n```"), "Body here");
        assert_eq!(strip_code_fences("plain answer"), "plain answer");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_soft_failure() {
        let mut config = AiConfig::new("test-key").with_timeout(Duration::from_millis(200));
        // Reserved TEST-NET address; connection fails fast, nothing listens
        config.endpoint = "http://192.0.2.1:9/v1/chat/completions".to_string();
        let extractor = OpenAiExtractor::new(config).unwrap();
        let spec = catalog::builtin_specs(None).remove(0);

        let result = extractor.extract("Some document text", &spec).await;
        assert!(result.is_none());
    }
}
