//! Provider abstraction layer for the Semem memory engine.
//!
//! Grounded on `llmspell-providers::abstraction` (the `ProviderInstance`
//! trait + `ProviderConfig::from_env` pattern) and the teacher's
//! `llmspell-hooks::rate_limiter::TokenBucket`. Concrete vendor SDKs
//! (Mistral, Claude, Nomic) are out of scope per spec.md §1; this crate
//! ships only the trait boundary, the priority-selection logic, an
//! `OllamaProvider` (the spec's explicit "zero-config fallback"), and a
//! `MockProvider` for tests.

pub mod error;
pub mod ollama;
pub mod prompt_template;
pub mod rate_limit;
pub mod selector;

pub use error::{ProviderError, Result};
pub use ollama::OllamaProvider;
pub use prompt_template::{PromptFormat, PromptTemplate, PromptTemplateService};
pub use rate_limit::{TokenBucket, TokenBucketConfig};
pub use selector::{select_provider, ProviderKind};

use async_trait::async_trait;

/// A chat/completion provider (§6 "an interface `chat(system, user, opts) ->
/// string`").
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Provider name, used for logging and template selection.
    fn name(&self) -> &str;

    /// Active model identifier, used by [`PromptTemplateService`] selection.
    fn model(&self) -> &str;

    /// Issue a chat completion call.
    async fn chat(&self, system: &str, user: &str, opts: ChatOptions) -> Result<String>;
}

/// An embedding provider (§6 "`embed(texts) -> Vec<Vec<f32>>`").
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Dimensionality of vectors this provider returns.
    fn dimension(&self) -> usize;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Per-call chat options (§4.7 "temperature <= 0.3" for concept extraction).
#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub temperature: f32,
    pub max_tokens: Option<usize>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self { temperature: 0.7, max_tokens: None }
    }
}

/// An in-memory provider used by tests and as a deterministic fixture for
/// e2e scenarios (§8 scenario 1/2) that don't want a live LLM/embedding
/// backend, mirroring the teacher's practice of keeping a `MockProvider`
/// alongside real connectors (`llmspell-testing`).
pub struct MockProvider {
    pub name: String,
    pub model: String,
    pub dimension: usize,
    /// Canned chat response, or a simple echo if `None`.
    pub canned_response: Option<String>,
}

impl MockProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            name: "mock".to_string(),
            model: "mock-model".to_string(),
            dimension,
            canned_response: None,
        }
    }

    #[must_use]
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.canned_response = Some(response.into());
        self
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, system: &str, user: &str, _opts: ChatOptions) -> Result<String> {
        if let Some(resp) = &self.canned_response {
            return Ok(resp.clone());
        }
        Ok(format!("[mock reply to: {user}] (system: {system})"))
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Deterministic pseudo-embedding: hash each text into a unit vector so
        // tests can assert on cosine similarity without a real model.
        Ok(texts.iter().map(|t| deterministic_vector(t, self.dimension)).collect())
    }
}

/// Deterministic, hash-seeded unit vector. Not a real embedding — used only
/// by [`MockProvider`] so tests are reproducible without a live model.
#[must_use]
pub fn deterministic_vector(text: &str, dim: usize) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut v = Vec::with_capacity(dim);
    let mut seed = {
        let mut h = DefaultHasher::new();
        text.hash(&mut h);
        h.finish()
    };
    for _ in 0..dim {
        // xorshift64
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        let f = (seed % 2000) as f32 / 1000.0 - 1.0;
        v.push(f);
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embed_is_deterministic() {
        let p = MockProvider::new(16);
        let a = p.embed(&["hello".to_string()]).await.unwrap();
        let b = p.embed(&["hello".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn mock_chat_returns_canned_response() {
        let p = MockProvider::new(8).with_response("42");
        let out = p.chat("sys", "user", ChatOptions::default()).await.unwrap();
        assert_eq!(out, "42");
    }
}
