//! Ollama connector: the "zero-config fallback" mentioned in §6. A local
//! HTTP daemon, so it's a reasonable minimal concrete connector to keep
//! in-core without pulling in a hosted vendor SDK (out of scope per §1).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ChatOptions, ChatProvider, EmbeddingProvider, ProviderError, Result};

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    embed_model: String,
    dimension: usize,
}

impl OllamaProvider {
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, embed_model: impl Into<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            embed_model: embed_model.into(),
            dimension,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatRequestOptions,
}

#[derive(Serialize)]
struct ChatRequestOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, system: &str, user: &str, opts: ChatOptions) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            stream: false,
            options: ChatRequestOptions { temperature: opts.temperature },
        };
        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::Http)?;
        if !resp.status().is_success() {
            return Err(ProviderError::Unavailable(format!("ollama chat returned {}", resp.status())));
        }
        let parsed: ChatResponse = resp.json().await.map_err(ProviderError::Http)?;
        Ok(parsed.message.content)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbedRequest { model: &self.embed_model, input: texts };
        let resp = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::Http)?;
        if !resp.status().is_success() {
            return Err(ProviderError::Unavailable(format!("ollama embed returned {}", resp.status())));
        }
        let parsed: EmbedResponse = resp.json().await.map_err(ProviderError::Http)?;
        Ok(parsed.embeddings)
    }
}
