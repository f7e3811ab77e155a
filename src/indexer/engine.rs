//! Indexing orchestrator: walks a directory tree through the worker pool.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use log::{info, warn};
use serde::Serialize;

use crate::analysis::DocumentParser;
use crate::error::{PilumError, Result};
use crate::index::{Document, InvertedIndex, PartialIndex};
use crate::indexer::config::{IndexerConfig, ProcessingMode};
use crate::pool::ThreadPool;

/// Result of one indexing run.
#[derive(Debug, Clone, Serialize)]
pub struct IndexingReport {
    /// Number of files whose contents were parsed.
    pub files_processed: usize,

    /// Number of directories walked.
    pub directories_scanned: usize,

    /// Wall-clock time from submission of the root task until the index
    /// was persisted.
    pub execution_time: Duration,
}

/// Builds an [`InvertedIndex`] over a directory tree.
///
/// Directory traversal itself runs on the worker pool: every subdirectory
/// becomes a new task submitted by the task that discovered it, and file
/// contents reach the index per the configured [`ProcessingMode`]. The
/// pool's dynamic `wait_all` is what lets this recursive fan-out drain
/// completely before the index is persisted.
///
/// Tasks report recoverable trouble (unreadable directories, rejected
/// submissions) by returning `false`; they never panic the pool.
pub struct Indexer {
    pool: Arc<ThreadPool>,
    index: Arc<InvertedIndex>,
    parser: Arc<DocumentParser>,
    mode: ProcessingMode,
    files_processed: Arc<AtomicUsize>,
    directories_scanned: Arc<AtomicUsize>,
}

impl Indexer {
    /// Create an indexer with its own worker pool.
    pub fn new(config: IndexerConfig, parser: DocumentParser) -> Result<Self> {
        let pool = Arc::new(ThreadPool::new(config.worker_threads)?);

        Ok(Indexer {
            pool,
            index: Arc::new(InvertedIndex::new()),
            parser: Arc::new(parser),
            mode: config.mode,
            files_processed: Arc::new(AtomicUsize::new(0)),
            directories_scanned: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// The shared index this orchestrator writes into.
    pub fn index(&self) -> &Arc<InvertedIndex> {
        &self.index
    }

    /// Walk `input_dir`, build the index, and persist it to `output_file`.
    ///
    /// Fails with [`PilumError::DirectoryNotFound`] when `input_dir` does
    /// not exist. Blocks until the whole traversal tree has drained.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_dir: P,
        output_file: Q,
    ) -> Result<IndexingReport> {
        let input_dir = input_dir.as_ref();

        if !input_dir.is_dir() {
            return Err(PilumError::DirectoryNotFound(input_dir.to_path_buf()));
        }

        self.files_processed.store(0, Ordering::Relaxed);
        self.directories_scanned.store(0, Ordering::Relaxed);

        let started = Instant::now();

        let walker = Walker {
            pool: Arc::clone(&self.pool),
            index: Arc::clone(&self.index),
            parser: Arc::clone(&self.parser),
            mode: self.mode,
            files_processed: Arc::clone(&self.files_processed),
            directories_scanned: Arc::clone(&self.directories_scanned),
        };
        walker.submit_directory(input_dir.to_path_buf());

        self.pool.wait_all();

        self.index.save(output_file)?;

        let report = IndexingReport {
            files_processed: self.files_processed.load(Ordering::Relaxed),
            directories_scanned: self.directories_scanned.load(Ordering::Relaxed),
            execution_time: started.elapsed(),
        };

        info!(
            "indexed {} files across {} directories in {:?}",
            report.files_processed, report.directories_scanned, report.execution_time
        );

        Ok(report)
    }

    /// Resolve `text` against the index using the build-time normalization
    /// pipeline.
    pub fn query(&self, text: &str) -> Option<Document> {
        let words = self.parser.parse_words(text);
        self.index.search(&words)
    }

    /// Stop the underlying pool. Also happens on drop.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

/// The state a traversal task carries: shared handles on the pool, index
/// and parser, cloned into every closure so tasks can keep fanning out.
#[derive(Clone)]
struct Walker {
    pool: Arc<ThreadPool>,
    index: Arc<InvertedIndex>,
    parser: Arc<DocumentParser>,
    mode: ProcessingMode,
    files_processed: Arc<AtomicUsize>,
    directories_scanned: Arc<AtomicUsize>,
}

impl Walker {
    /// One directory task: list entries, fan out subdirectories, and route
    /// files per the processing mode.
    fn process_dir(&self, dir: &Path) -> bool {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("skipping unreadable directory {}: {e}", dir.display());
                return false;
            }
        };

        self.directories_scanned.fetch_add(1, Ordering::Relaxed);

        let mut batch = Vec::new();
        let mut clean = true;

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    warn!("skipping unreadable entry in {}: {e}", dir.display());
                    clean = false;
                    continue;
                }
            };

            if path.is_dir() {
                clean &= self.submit_directory(path);
            } else if path.is_file() {
                match self.mode {
                    ProcessingMode::PerFile => clean &= self.submit_file(path),
                    ProcessingMode::PerDirectory | ProcessingMode::BulkMerge => batch.push(path),
                }
            }
        }

        if !batch.is_empty() {
            clean &= self.submit_batch(batch);
        }

        clean
    }

    fn submit_directory(&self, dir: PathBuf) -> bool {
        let walker = self.clone();
        let dir_display = dir.clone();

        match self.pool.add_task(move || walker.process_dir(&dir)) {
            Ok(_) => true,
            Err(e) => {
                warn!("could not submit directory task for {}: {e}", dir_display.display());
                false
            }
        }
    }

    /// Per-file mode: each (word, file) pair goes straight into the shared
    /// index.
    fn submit_file(&self, path: PathBuf) -> bool {
        let walker = self.clone();

        let submitted = self.pool.add_task(move || {
            let words = walker.parser.parse_file(&path);
            let document = path.to_string_lossy().into_owned();

            for word in &words {
                walker.index.add(word, &document);
            }

            walker.files_processed.fetch_add(1, Ordering::Relaxed);
            true
        });

        match submitted {
            Ok(_) => true,
            Err(e) => {
                warn!("could not submit file task: {e}");
                false
            }
        }
    }

    /// Batched modes: parse every file of the directory into a local
    /// partial index, then merge it into the shared index either word by
    /// word or in one bulk call.
    fn submit_batch(&self, files: Vec<PathBuf>) -> bool {
        let walker = self.clone();

        let submitted = self.pool.add_task(move || {
            let mut partial = PartialIndex::new();

            for path in &files {
                let words = walker.parser.parse_file(path);
                let document = path.to_string_lossy().into_owned();

                for word in words {
                    partial.entry(word).or_default().insert(document.clone());
                }

                walker.files_processed.fetch_add(1, Ordering::Relaxed);
            }

            match walker.mode {
                ProcessingMode::PerDirectory => {
                    for (word, docs) in &partial {
                        walker.index.add_documents(word, docs);
                    }
                }
                _ => walker.index.merge(&partial),
            }

            true
        });

        match submitted {
            Ok(_) => true,
            Err(e) => {
                warn!("could not submit batch task: {e}");
                false
            }
        }
    }
}
