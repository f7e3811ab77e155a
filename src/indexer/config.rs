//! Configuration for the indexing orchestrator.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How file contents reach the shared index.
///
/// The modes trade lock contention against batching granularity: per-file
/// tasks touch the shared index constantly with tiny critical sections,
/// per-directory batches merge word-by-word, and bulk merges hand the whole
/// local mapping over in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessingMode {
    /// One task per file, writing each (word, file) pair straight into the
    /// shared index.
    #[default]
    PerFile,

    /// One task per directory building a local partial index, merged into
    /// the shared index one word at a time.
    PerDirectory,

    /// Like `PerDirectory`, but the whole partial index is merged in a
    /// single call.
    BulkMerge,
}

/// Configuration for an [`Indexer`](crate::indexer::Indexer).
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Number of pool worker threads.
    pub worker_threads: usize,

    /// Batching policy for file processing.
    pub mode: ProcessingMode,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            worker_threads: num_cpus::get(),
            mode: ProcessingMode::default(),
        }
    }
}
