//! Shared error taxonomy, identifiers, escaping helpers and DTOs for the
//! Semem memory engine workspace.
//!
//! This crate has no dependency on any other `semem-*` crate — everything
//! here is the small, stable vocabulary the rest of the workspace shares so
//! that, for example, `semem-store` and `semem-ingest` escape SPARQL
//! literals identically without one depending on the other.

pub mod error;
pub mod escaping;
pub mod ids;
pub mod prelude;
pub mod types;
pub mod vocab;

pub use error::{CoreError, Result};
pub use types::{Hit, MemoryType, ProcessingStatus, RelationshipType, EMBEDDING_DIMENSION};
