//! Root error taxonomy.
//!
//! Each crate in the workspace defines its own `thiserror` enum following the
//! kinds below (Validation, Transient, Permanent, Integrity, Provider,
//! Timeout, Cancelled). `CoreError` composes them at the dispatch boundary,
//! the way `llmspell_core::LLMSpellError` sits above per-crate errors in the
//! teacher workspace.

use thiserror::Error;

/// Result type alias for core-level operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// The outermost error kind, returned by the verb dispatcher.
///
/// Downstream crates map their specific errors into one of these kinds
/// (`From` impls live in each crate's `error.rs`) so callers can branch on a
/// small, stable taxonomy instead of reaching into implementation detail.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad input: missing required field, out-of-range value, empty content.
    #[error("validation error: {0}")]
    Validation(String),

    /// Backend call failed after exhausting the retry budget.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend rejected the request outright (bad query, auth failure); not retried.
    #[error("backend rejected request: {0}")]
    BackendRejected(String),

    /// An invariant was violated at runtime (dimension mismatch, double promotion, ...).
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// LLM or embedding provider returned an unusable response after retries.
    #[error("provider error: {0}")]
    Provider(String),

    /// Operation exceeded its configured deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Operation was cancelled by caller request, not a failure.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Dispatcher received a verb it doesn't recognize.
    #[error("unknown verb: {0}")]
    UnknownVerb(String),

    /// Serialization/deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}

impl CoreError {
    /// Whether this error represents a degraded-but-answerable condition
    /// (used by `ask` to decide whether to still return a partial answer).
    #[must_use]
    pub const fn is_degradable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::BackendUnavailable(_))
    }
}
