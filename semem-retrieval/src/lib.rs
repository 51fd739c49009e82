//! The Hybrid Retriever (C10), ZPT Navigator (C11), and Context Builder
//! (C14): turns a query embedding plus session lens into a token-budgeted
//! prompt.
//!
//! Grounded on `llmspell-context`'s assembly/retrieval modules and
//! `llmspell-rag::traits::hybrid` (see `DESIGN.md`); the HNSW index and
//! personalized PageRank have no external-crate counterpart in scope
//! (§9) and are reimplemented in-crate.

pub mod context;
pub mod error;
pub mod hnsw;
pub mod ppr;
pub mod retriever;
pub mod zpt;

pub use context::{build_context, ContextBundle, DEFAULT_TOKEN_BUDGET};
pub use error::{Result, RetrievalError};
pub use hnsw::{HnswConfig, HnswIndex};
pub use ppr::{personalized_pagerank, Adjacency, DEFAULT_ALPHA};
pub use retriever::{HybridRetriever, RetrieverWeights, DEFAULT_THRESHOLD};
pub use zpt::{PanFilter, TemporalWindow, TiltStyle, ZoomLevel, ZptNavigator, ZptState};
