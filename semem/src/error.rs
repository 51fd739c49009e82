//! `semem`'s error type: `CoreError` is the thin, `#[from]`-composing root
//! this dispatch boundary sits above (§7: "C13 formats the final user-
//! visible error"), the way `llmspell_core::LLMSpellError` sits above its
//! own workspace's per-crate errors.

pub use semem_core::{CoreError, Result};

use thiserror::Error;

/// Errors constructing a [`crate::Semem`] from a [`semem_config::SememConfig`]
/// via [`crate::Semem::from_config`]. Distinct from [`CoreError`] because
/// these happen before there's a running engine to dispatch verbs against.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("configuration is invalid: {0}")]
    Config(#[from] semem_config::ConfigError),

    #[error("no usable {0} provider entry (every entry's API key is unset)")]
    NoUsableProvider(&'static str),

    #[error("provider {0:?} has no concrete in-core connector; construct it yourself and use Semem::new")]
    UnsupportedProvider(String),
}
