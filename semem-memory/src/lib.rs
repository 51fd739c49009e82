//! Memory Store (C5): eager/lazy interaction persistence, promotion, and
//! decay over a `semem_store::SparqlStore` backend.

pub mod error;
pub mod store;
pub mod types;

pub use error::{MemoryError, Result};
pub use store::MemoryStore;
pub use types::{Interaction, ScoredInteraction, DEFAULT_LONG_TERM_THRESHOLD};
