//! Concept Extractor (C7): LLM-backed extraction of a normalized concept list.
//!
//! Grounded on `semem-providers::ChatProvider` + `PromptTemplateService`
//! (C3) for the call shape, and on the teacher's practice (seen throughout
//! `llmspell-agents`) of tolerating a fenced-code-block response from a chat
//! model before parsing strict JSON.

use std::collections::HashSet;

use semem_providers::{ChatOptions, ChatProvider, PromptTemplateService};
use tracing::warn;

use crate::error::{IngestError, Result};

/// Maximum number of concepts kept per extraction (§4.7 "cap the list at 32").
const MAX_CONCEPTS: usize = 32;
/// Concepts longer than this are treated as hallucinated sentences and dropped.
const MAX_CONCEPT_LEN: usize = 120;
/// Retries on JSON-parse failure before giving up (§4.7 "retry up to 2 times").
const MAX_PARSE_RETRIES: usize = 2;
const TEMPERATURE: f32 = 0.2;

/// Extract a deduplicated, length-filtered concept list from `text` using
/// `provider` and the `concept-extraction` prompt template.
pub async fn extract_concepts(
    provider: &dyn ChatProvider,
    templates: &PromptTemplateService,
    text: &str,
) -> Result<Vec<String>> {
    let template = templates.select("concept-extraction", provider.model());
    let mut params = std::collections::HashMap::new();
    params.insert("text".to_string(), text.to_string());
    let system = "You extract a concise list of key concepts from text. Respond with a JSON array of strings only.";
    let mut user = template.render(&params);

    let mut last_err = None;
    for attempt in 0..=MAX_PARSE_RETRIES {
        let opts = ChatOptions { temperature: TEMPERATURE, max_tokens: Some(512) };
        let raw = provider
            .chat(system, &user, opts)
            .await
            .map_err(IngestError::Provider)?;
        match parse_concept_list(&raw) {
            Ok(concepts) => return Ok(normalize(concepts)),
            Err(e) => {
                last_err = Some(e);
                user = format!("{user}\n\nReminder: respond with a JSON array of strings ONLY, no prose, no markdown fences.");
                warn!(attempt, "concept extraction response failed to parse as JSON array");
            }
        }
    }
    let _ = last_err;
    Err(IngestError::ParseAfterRetries)
}

/// Strip an optional leading/trailing ```` ```json ```` fence, then parse a
/// strict JSON array of strings.
fn parse_concept_list(raw: &str) -> std::result::Result<Vec<String>, serde_json::Error> {
    let trimmed = strip_code_fence(raw.trim());
    serde_json::from_str::<Vec<String>>(trimmed)
}

fn strip_code_fence(s: &str) -> &str {
    let s = s.trim();
    if let Some(rest) = s.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches(['\n', '\r']);
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim();
        }
        return rest.trim();
    }
    s
}

/// Trim, drop empties and overlong strings, fold case only for dedup
/// purposes (preserving original casing in the kept value), cap at
/// [`MAX_CONCEPTS`].
fn normalize(concepts: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in concepts {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > MAX_CONCEPT_LEN {
            continue;
        }
        let key = trimmed.to_lowercase();
        if seen.insert(key) {
            out.push(trimmed.to_string());
        }
        if out.len() >= MAX_CONCEPTS {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use semem_providers::MockProvider;

    #[tokio::test]
    async fn extracts_concepts_from_clean_json_response() {
        let provider = MockProvider::new(8).with_response(r#"["rust", "memory safety", "rust"]"#);
        let templates = PromptTemplateService::new();
        let out = extract_concepts(&provider, &templates, "some text about rust").await.unwrap();
        assert_eq!(out, vec!["rust".to_string(), "memory safety".to_string()]);
    }

    #[tokio::test]
    async fn tolerates_a_json_code_fence() {
        let provider = MockProvider::new(8).with_response("```json\n[\"a\", \"b\"]\n```");
        let templates = PromptTemplateService::new();
        let out = extract_concepts(&provider, &templates, "text").await.unwrap();
        assert_eq!(out, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn fails_after_retries_on_unparseable_response() {
        let provider = MockProvider::new(8).with_response("not json at all");
        let templates = PromptTemplateService::new();
        let err = extract_concepts(&provider, &templates, "text").await.unwrap_err();
        assert!(matches!(err, IngestError::ParseAfterRetries));
    }

    #[test]
    fn normalize_drops_empty_and_overlong_and_dedupes_case_insensitively() {
        let long = "x".repeat(200);
        let input = vec!["Rust".to_string(), "".to_string(), "rust".to_string(), long];
        let out = normalize(input);
        assert_eq!(out, vec!["Rust".to_string()]);
    }

    #[test]
    fn normalize_caps_list_length() {
        let input: Vec<String> = (0..50).map(|i| format!("concept{i}")).collect();
        let out = normalize(input);
        assert_eq!(out.len(), MAX_CONCEPTS);
    }
}
