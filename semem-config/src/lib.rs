//! Configuration loading for the Semem memory engine.
//!
//! Mirrors `llmspell-config`'s shape (a single serde-deserializable root
//! struct with per-section sub-configs) but scoped to what §6 of the spec
//! asks for: a JSON document with `storage`, `llmProviders`,
//! `embeddingProviders`, `memory` and `performance` sections. API keys are
//! never stored in the document itself — they're resolved from environment
//! variables named in each provider entry, the same `from_env` pattern
//! `llmspell_providers::ProviderConfig` uses.

mod error;

pub use error::{ConfigError, Result};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration document (§6 "Config file").
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SememConfig {
    pub storage: StorageConfig,
    #[serde(rename = "llmProviders")]
    pub llm_providers: Vec<ProviderEntry>,
    #[serde(rename = "embeddingProviders")]
    pub embedding_providers: Vec<ProviderEntry>,
    pub memory: MemoryConfig,
    pub performance: PerformanceConfig,
}

impl Default for SememConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            llm_providers: Vec::new(),
            embedding_providers: Vec::new(),
            memory: MemoryConfig::default(),
            performance: PerformanceConfig::default(),
        }
    }
}

/// SPARQL endpoint configuration (§6 "SPARQL endpoint").
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub query: String,
    pub update: String,
    pub user: String,
    /// Name of the environment variable holding the password. Never the
    /// password itself.
    pub password_env: String,
    #[serde(rename = "graphName")]
    pub graph_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            query: "http://localhost:3030/semem/query".to_string(),
            update: "http://localhost:3030/semem/update".to_string(),
            user: "admin".to_string(),
            password_env: "SEMEM_SPARQL_PASSWORD".to_string(),
            graph_name: "http://hyperdata.it/content".to_string(),
        }
    }
}

impl StorageConfig {
    /// Resolve the SPARQL password from the configured environment variable.
    ///
    /// Returns `None` if the variable is unset rather than erroring, since an
    /// unauthenticated endpoint is a legitimate configuration.
    #[must_use]
    pub fn resolve_password(&self) -> Option<String> {
        std::env::var(&self.password_env).ok()
    }
}

/// One entry in `llmProviders`/`embeddingProviders`. Priority is list order:
/// the first entry whose API key resolves wins (§6, `ProviderSelector`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderEntry {
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API key. Absent for
    /// providers that need none (e.g. a local Ollama daemon).
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderEntry {
    /// Resolve the API key from the environment. A provider with no
    /// `api_key_env` configured (e.g. Ollama) always resolves to `None`
    /// and is still eligible for selection as the zero-config fallback.
    #[must_use]
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key_env.as_ref().and_then(|var| std::env::var(var).ok())
    }

    /// Whether this entry is usable: either it has a resolvable API key, or
    /// it declares none at all (treated as the zero-config fallback case).
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.api_key_env.is_none() || self.resolve_api_key().is_some()
    }
}

/// Memory-engine tunables (§6 `memory{dimension, similarityThreshold,
/// contextWindow, decayRate}`).
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub dimension: usize,
    #[serde(rename = "similarityThreshold")]
    pub similarity_threshold: f32,
    #[serde(rename = "contextWindow")]
    pub context_window: usize,
    #[serde(rename = "decayRate")]
    pub decay_rate: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dimension: semem_core::EMBEDDING_DIMENSION,
            similarity_threshold: 0.1,
            context_window: 4000,
            decay_rate: 0.6,
        }
    }
}

/// Runtime/resource tunables (§5 defaults: pool size 16, fan-out 8, retries).
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub sparql_pool_size: usize,
    pub ingest_fan_out: usize,
    pub sparql_timeout_secs: u64,
    pub llm_timeout_secs: u64,
    pub document_upload_timeout_secs: u64,
    pub retry_attempts: u32,
    pub retry_base_ms: u64,
    pub retry_cap_ms: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            sparql_pool_size: 16,
            ingest_fan_out: 8,
            sparql_timeout_secs: 30,
            llm_timeout_secs: 60,
            document_upload_timeout_secs: 600,
            retry_attempts: 3,
            retry_base_ms: 200,
            retry_cap_ms: 1600,
        }
    }
}

impl SememConfig {
    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(ConfigError::Parse)
    }

    /// Load configuration from a JSON file on disk.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        let config = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), "loaded semem configuration");
        Ok(config)
    }

    /// Validate cross-field invariants not expressible in `serde(default)`.
    pub fn validate(&self) -> Result<()> {
        if self.memory.dimension == 0 {
            return Err(ConfigError::Invalid("memory.dimension must be non-zero".to_string()));
        }
        if !(0.0..=1.0).contains(&self.memory.similarity_threshold) {
            return Err(ConfigError::Invalid(
                "memory.similarityThreshold must be in [0, 1]".to_string(),
            ));
        }
        if self.performance.retry_base_ms > self.performance.retry_cap_ms {
            return Err(ConfigError::Invalid(
                "performance.retry_base_ms must be <= retry_cap_ms".to_string(),
            ));
        }
        tracing::debug!("configuration validated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(SememConfig::default().validate().is_ok());
    }

    #[test]
    fn parses_minimal_json() {
        let cfg = SememConfig::from_json("{}").unwrap();
        assert_eq!(cfg.memory.dimension, semem_core::EMBEDDING_DIMENSION);
        assert_eq!(cfg.storage.graph_name, "http://hyperdata.it/content");
    }

    #[test]
    fn provider_with_no_key_env_is_usable() {
        let entry = ProviderEntry {
            name: "ollama".to_string(),
            model: "llama3".to_string(),
            endpoint: Some("http://localhost:11434".to_string()),
            api_key_env: None,
            timeout_secs: None,
        };
        assert!(entry.is_usable());
    }

    #[test]
    fn provider_with_unset_key_env_is_unusable() {
        let entry = ProviderEntry {
            name: "mistral".to_string(),
            model: "mistral-large".to_string(),
            endpoint: None,
            api_key_env: Some("SEMEM_TEST_NONEXISTENT_KEY_VAR".to_string()),
            timeout_secs: None,
        };
        assert!(!entry.is_usable());
    }

    #[test]
    fn rejects_out_of_range_similarity_threshold() {
        let mut cfg = SememConfig::default();
        cfg.memory.similarity_threshold = 1.5;
        assert!(cfg.validate().is_err());
    }
}
