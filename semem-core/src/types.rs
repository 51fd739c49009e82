//! Shared value types used across crate boundaries.
//!
//! Kept deliberately small: anything with a single owner (e.g. `ZptState`,
//! `DocumentChunk`) lives in the crate that owns it. These are the types
//! that cross crate boundaries often enough that duplicating them would
//! drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tier an interaction currently lives in.
///
/// Transitions are monotonic for the lazy→processed axis (I5) and
/// policy/event-driven for short-term→long-term (§4.5, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryType {
    ShortTerm,
    LongTerm,
    Lazy,
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ShortTerm => "short-term",
            Self::LongTerm => "long-term",
            Self::Lazy => "lazy",
        };
        f.write_str(s)
    }
}

/// Whether an interaction has been embedded and concept-extracted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Lazy,
    Processed,
}

/// The kind of a reified `ragno:Relationship` edge (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipType {
    Similarity,
    EntityMatch,
    CommunityBridge,
    SemanticAnswer,
    KeywordAnswer,
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Similarity => "similarity",
            Self::EntityMatch => "entity-match",
            Self::CommunityBridge => "community-bridge",
            Self::SemanticAnswer => "semantic-answer",
            Self::KeywordAnswer => "keyword-answer",
        };
        f.write_str(s)
    }
}

/// A single retrieval hit, shared between the retriever, the context
/// builder, and the verb dispatcher's response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hit {
    /// Stable URI of the retrieved node (interaction, corpuscle, entity, ...).
    pub uri: String,
    /// Optional human-facing title (e.g. `dcterms:title` of a Document).
    pub title: Option<String>,
    /// Retrieved text content.
    pub content: String,
    /// Final merged score in `[0, 1]`.
    pub score: f32,
    /// Per-strategy scores, kept for observability (§4.10).
    pub similarity_score: Option<f32>,
    pub exact_score: Option<f32>,
    pub traversal_score: Option<f32>,
    /// When the underlying content was last touched.
    pub timestamp: Option<DateTime<Utc>>,
}

impl Hit {
    /// Rough token estimate used by the context builder's token budget (§4.14).
    #[must_use]
    pub fn approx_tokens(&self) -> usize {
        self.content.len() / 4
    }
}

/// Dimension of embedding vectors used throughout the engine. Interactions
/// with any other dimension are rejected at the store boundary (I1, §8).
pub const EMBEDDING_DIMENSION: usize = 768;
