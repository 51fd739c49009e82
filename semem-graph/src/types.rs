//! Graph-local DTOs: the corpuscle view the relationship builder sweeps
//! over, and the reified relationship it produces.
//!
//! Grounded on `llmspell-graph::types::{Entity, Relationship}`, adapted from
//! a bi-temporal property graph to the spec's reified RDF shape (§3:
//! relationships are first-class nodes, not plain triples, so weight and
//! provenance are queryable).

use chrono::{DateTime, Utc};
use semem_core::RelationshipType;
use serde::{Deserialize, Serialize};

/// A node the relationship builder can connect: a concept corpuscle, a
/// document, or an extracted entity, identified by URI with an optional
/// embedding and an optional set of entity labels (for the entity-match
/// strategy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpuscle {
    pub uri: String,
    pub embedding: Option<Vec<f32>>,
    pub entity_labels: Vec<String>,
}

/// A reified `ragno:Relationship` edge (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub uri: String,
    pub source: String,
    pub target: String,
    pub relationship_type: RelationshipType,
    pub weight: f32,
    pub description: Option<String>,
    pub source_corpus: Option<String>,
    pub sweep_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Relationship {
    #[must_use]
    pub fn new(source: &str, target: &str, relationship_type: RelationshipType, weight: f32, sweep_id: &str) -> Self {
        Self {
            uri: format!(
                "{}Relationship/{}",
                semem_core::vocab::SEMEM,
                semem_core::ids::content_hash(&[source, target, &relationship_type.to_string()])
            ),
            source: source.to_string(),
            target: target.to_string(),
            relationship_type,
            weight: weight.clamp(0.0, 1.0),
            description: None,
            source_corpus: None,
            sweep_id: sweep_id.to_string(),
            timestamp: Utc::now(),
        }
    }
}
