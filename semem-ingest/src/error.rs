//! Error types for chunking, extraction, and ingestion (C4, C6-C8).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("memory store error: {0}")]
    Memory(#[from] semem_memory::MemoryError),

    #[error("graph error: {0}")]
    Graph(#[from] semem_graph::GraphError),

    #[error("provider error: {0}")]
    Provider(#[from] semem_providers::ProviderError),

    #[error("embedding provider unavailable")]
    ProviderUnavailable,

    #[error("concept extraction failed to parse a valid JSON array after retries")]
    ParseAfterRetries,

    #[error("document has no content")]
    EmptyDocument,

    #[error("ingestion failed for document {document}: {reason}")]
    Ingestion { document: String, reason: String },
}

impl From<IngestError> for semem_core::CoreError {
    fn from(e: IngestError) -> Self {
        match e {
            IngestError::Memory(m) => m.into(),
            IngestError::Graph(g) => g.into(),
            IngestError::Provider(p) => p.into(),
            IngestError::ProviderUnavailable => semem_core::CoreError::Provider("embedding provider unavailable".to_string()),
            IngestError::ParseAfterRetries => semem_core::CoreError::Provider("concept extraction parse failure".to_string()),
            IngestError::EmptyDocument => semem_core::CoreError::Validation("document has no content".to_string()),
            IngestError::Ingestion { document, reason } => {
                semem_core::CoreError::Integrity(format!("document {document}: {reason}"))
            }
        }
    }
}
