//! The Triple Store Adapter (C1) and Query Template Service (C2).
//!
//! Grounded on `llmspell-graph::storage::SurrealDBBackend`'s
//! backend-behind-trait shape and `other_examples/.../adapters/rdf.rs`'s
//! SPARQL-over-HTTP wire conventions. Every crate upstream of this one
//! (`semem-memory`, `semem-ingest`, `semem-graph`, `semem-retrieval`)
//! depends on `SparqlStore` rather than on a concrete backend.

pub mod error;
pub mod query_template;
pub mod sparql;
pub mod term;

pub use error::{Result, StoreError};
pub use query_template::QueryTemplateService;
pub use sparql::{Bindings, HttpSparqlStore, InMemorySparqlStore, ResultBindings, RetryPolicy, SparqlEndpointConfig, SparqlStore};
pub use term::{PatternTerm, Term, Triple, TriplePattern};
