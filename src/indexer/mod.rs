//! Indexing orchestrator.
//!
//! Couples the worker pool to the inverted index: directory traversal and
//! file parsing are pool tasks that fan out recursively, and their partial
//! results reach the shared index under one of three batching policies
//! ([`ProcessingMode`]).

pub mod config;
pub mod engine;

pub use config::{IndexerConfig, ProcessingMode};
pub use engine::{Indexer, IndexingReport};
