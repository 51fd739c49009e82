//! Error types for the relationship builder and graph sweeps.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("store error: {0}")]
    Store(#[from] semem_store::StoreError),

    #[error("invariant violation: {0}")]
    Integrity(String),
}

impl From<GraphError> for semem_core::CoreError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::Store(s) => s.into(),
            GraphError::Integrity(m) => semem_core::CoreError::Integrity(m),
        }
    }
}
