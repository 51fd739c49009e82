//! Error types for the Memory Store (C5).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MemoryError>;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("store error: {0}")]
    Store(#[from] semem_store::StoreError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("interaction not found: {0}")]
    NotFound(String),
}

impl From<MemoryError> for semem_core::CoreError {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::Store(s) => s.into(),
            MemoryError::Validation(m) => semem_core::CoreError::Validation(m),
            MemoryError::Integrity(m) => semem_core::CoreError::Integrity(m),
            MemoryError::NotFound(m) => semem_core::CoreError::NotFound(m),
        }
    }
}
