//! `semem-retrieval`'s error enum, mapped into `semem_core::CoreError` at
//! the dispatch boundary (§7 propagation policy: "C5-C12 map them into the
//! taxonomy above and add component context").

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("store error: {0}")]
    Store(#[from] semem_store::StoreError),

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("index integrity error: {0}")]
    Integrity(String),
}

impl From<RetrievalError> for semem_core::CoreError {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::Store(err) => Self::BackendUnavailable(err.to_string()),
            RetrievalError::UnknownSession(id) => Self::NotFound(id),
            RetrievalError::Validation(msg) => Self::Validation(msg),
            RetrievalError::Integrity(msg) => Self::Integrity(msg),
        }
    }
}
