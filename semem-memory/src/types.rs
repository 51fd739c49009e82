//! Interaction DTO and the decay policy (§3 "Interaction", §4.5, §9).

use chrono::{DateTime, Utc};
use semem_core::{MemoryType, ProcessingStatus};
use serde::{Deserialize, Serialize};

/// The atomic memory unit (`semem:Interaction`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub prompt: String,
    pub output: String,
    /// `None` exactly when `status == Lazy` (I1).
    pub embedding: Option<Vec<f32>>,
    pub timestamp: DateTime<Utc>,
    pub access_count: u64,
    pub decay_factor: f32,
    pub memory_type: MemoryType,
    pub status: ProcessingStatus,
    pub title: Option<String>,
    pub label: Option<String>,
}

impl Interaction {
    /// Construct an eager (fully processed) interaction. Caller must supply
    /// an embedding of the configured dimension; `MemoryStore::store`
    /// enforces I1 at the boundary.
    #[must_use]
    pub fn new_eager(prompt: impl Into<String>, output: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: semem_core::ids::new_id(),
            prompt: prompt.into(),
            output: output.into(),
            embedding: Some(embedding),
            timestamp: Utc::now(),
            access_count: 0,
            decay_factor: 1.0,
            memory_type: MemoryType::ShortTerm,
            status: ProcessingStatus::Processed,
            title: None,
            label: None,
        }
    }

    /// Construct a lazy interaction: no embedding, no concepts yet (§4.5
    /// `storeLazy`).
    #[must_use]
    pub fn new_lazy(content: impl Into<String>, content_type: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: semem_core::ids::new_id(),
            prompt: content,
            output: String::new(),
            embedding: None,
            timestamp: Utc::now(),
            access_count: 0,
            decay_factor: 1.0,
            memory_type: MemoryType::Lazy,
            status: ProcessingStatus::Lazy,
            title: None,
            label: Some(content_type.into()),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Decay score combining reinforcement (`access_count`) and the raw
    /// decay factor (§4.5 `[EXPANSION]`: `decay_factor * (1 + ln(1 +
    /// access_count))`).
    #[must_use]
    pub fn decay_score(&self) -> f32 {
        self.decay_factor * (1.0 + (1.0 + self.access_count as f32).ln())
    }
}

/// A search hit paired with its similarity score (§4.5 `search`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredInteraction {
    pub interaction: Interaction,
    pub score: f32,
}

/// Threshold controlling short-term -> long-term promotion (§3, §4.5).
/// Default 0.6, overridable from `semem_config::MemoryConfig::decay_rate`.
pub const DEFAULT_LONG_TERM_THRESHOLD: f32 = 0.6;
