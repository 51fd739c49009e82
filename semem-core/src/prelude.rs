//! Convenience re-exports for downstream crates.
//!
//! `use semem_core::prelude::*;` pulls in the error, id and type vocabulary
//! most crates in the workspace need, the way `llmspell_memory::prelude`
//! does for its own crate.

pub use crate::error::{CoreError, Result};
pub use crate::escaping::{escape_literal, format_datetime, format_entity_list, quote_uri, unescape_literal};
pub use crate::ids::{content_hash, new_id};
pub use crate::types::{Hit, MemoryType, ProcessingStatus, RelationshipType, EMBEDDING_DIMENSION};
