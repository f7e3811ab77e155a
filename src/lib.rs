//! # Pilum
//!
//! A concurrent inverted index builder for Rust.
//!
//! ## Features
//!
//! - Custom worker pool with per-task result handles and recursive fan-out
//! - Inverted index with two-level locking for high read/write concurrency
//! - Parallel directory traversal with three batching policies
//! - Porter stemming, case folding and stop-word removal
//! - JSON index persistence

pub mod analysis;
pub mod cli;
pub mod error;
pub mod index;
pub mod indexer;
pub mod pool;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
