//! Error taxonomy for the triple store adapter (C1, §4.1 and §7).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transient backend failure eligible for the capped-backoff retry (5xx,
    /// connection reset, timeout still within budget).
    #[error("transient backend error: {0}")]
    Transient(String),

    /// The backend rejected the request outright (bad query, 4xx other than
    /// 429/401/403); never retried.
    #[error("permanent backend error: {0}")]
    Permanent(String),

    /// HTTP status the adapter couldn't otherwise classify.
    #[error("http error, status {0}")]
    Http(u16),

    /// 401/403 on the configured endpoint; short-circuits without retry.
    #[error("backend authentication failed")]
    AuthFailed,

    /// Operation exceeded its configured deadline (§5 default 30s).
    #[error("store operation timed out: {0}")]
    Timeout(String),

    /// `application/sparql-results+json` body could not be parsed.
    #[error("failed to parse SPARQL results: {0}")]
    Parse(String),

    /// An invariant the store boundary enforces was violated (I1: embedding
    /// dimension mismatch; I5: double lazy->processed promotion).
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl StoreError {
    /// Whether this error is eligible for the capped-backoff retry policy.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<StoreError> for semem_core::CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Timeout(m) => semem_core::CoreError::Timeout(m),
            StoreError::Integrity(m) => semem_core::CoreError::Integrity(m),
            StoreError::AuthFailed => semem_core::CoreError::BackendRejected("authentication failed".to_string()),
            StoreError::Permanent(m) => semem_core::CoreError::BackendRejected(m),
            other => semem_core::CoreError::BackendUnavailable(other.to_string()),
        }
    }
}
