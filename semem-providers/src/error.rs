//! Error types for provider calls.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("provider returned an unusable response after retries: {0}")]
    UnusableResponse(String),

    #[error("provider request timed out: {0}")]
    Timeout(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no usable provider found in configuration")]
    NoProvider,
}

impl From<ProviderError> for semem_core::CoreError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::Timeout(m) => semem_core::CoreError::Timeout(m),
            other => semem_core::CoreError::Provider(other.to_string()),
        }
    }
}
