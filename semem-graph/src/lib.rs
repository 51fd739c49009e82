//! Ragno vocabulary and the Relationship Builder (C9).
//!
//! The concrete `ragno:`/`semem:`/... namespace IRIs are defined once in
//! `semem_core::vocab` (shared by writers in `semem-ingest` and readers
//! here and in `semem-retrieval`, resolving the canonical-shape note in §9)
//! and re-exported here under this crate's own name since this is the crate
//! the spec component table assigns vocabulary ownership to.

pub mod error;
pub mod relationship_builder;
pub mod types;
pub mod writer;

pub use error::{GraphError, Result};
pub use relationship_builder::{cosine_similarity, RelationshipBuilder, SweepConfig};
pub use semem_core::vocab as ragno;
pub use types::{Corpuscle, Relationship};
pub use writer::{to_insert_query, to_triples};
