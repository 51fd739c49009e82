//! Semem: a persistent semantic-memory engine for LLM agents.
//!
//! This crate is the workspace's top-level binding: [`dispatch::Semem`]
//! coordinates the triple store, memory store, ingestion orchestrator,
//! relationship builder, hybrid retriever, ZPT navigator, and VSOM trainer
//! behind the eight-verb surface (C13). Grounded on
//! `llmspell-memory::manager::DefaultMemoryManager`'s "manager coordinates
//! subsystems" shape, as recorded in `DESIGN.md`.

pub mod dispatch;
pub mod error;

pub use dispatch::{Semem, VerbRequest, VerbResponse};
pub use error::{CoreError, Result, SetupError};
