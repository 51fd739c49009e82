//! Embedding Cache (C4), Chunker (C6), Concept Extractor (C7) and the
//! Ingestion Orchestrator (C8): text -> chunks -> embeddings -> concepts ->
//! persisted RDF, with bounded, rate-limited fan-out per document.

pub mod chunker;
pub mod concept_extractor;
pub mod embedding_cache;
pub mod error;
pub mod orchestrator;

pub use chunker::{chunk, reassemble, Chunk, ChunkerConfig};
pub use concept_extractor::extract_concepts;
pub use embedding_cache::EmbeddingCache;
pub use error::{IngestError, Result};
pub use orchestrator::{Document, IngestionOrchestrator, IngestionReport, DEFAULT_FAN_OUT};
