//! Error types for the Pilum library.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`PilumError`] enum. API misuse (submitting to a closed pool, retrieving
//! an already-consumed task handle, running the indexer against a missing
//! directory) surfaces synchronously through these variants; failures inside
//! a task's work are captured in its result handle instead and only surface
//! when the handle is consumed.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::pool::TaskId;

/// The main error type for Pilum operations.
#[derive(Error, Debug)]
pub enum PilumError {
    /// I/O errors (file and directory operations).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Task submitted after the pool began shutting down.
    #[error("worker pool is closed")]
    PoolClosed,

    /// Operation on a task id that was never issued or whose result handle
    /// has already been consumed.
    #[error("unknown task id {0} (never submitted or already retrieved)")]
    UnknownTask(TaskId),

    /// The indexing root directory does not exist.
    #[error("input directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// Text analysis errors (stop-word loading, tokenization).
    #[error("analysis error: {0}")]
    Analysis(String),

    /// Index persistence and lookup errors.
    #[error("index error: {0}")]
    Index(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases.
    #[error("{0}")]
    Other(String),

    /// Generic anyhow error.
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with [`PilumError`].
pub type Result<T> = std::result::Result<T, PilumError>;

impl PilumError {
    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        PilumError::Analysis(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        PilumError::Index(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        PilumError::Other(msg.into())
    }

    /// Create a new internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        PilumError::Other(format!("Internal error: {}", msg.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = PilumError::analysis("bad stop-word file");
        assert_eq!(error.to_string(), "analysis error: bad stop-word file");

        let error = PilumError::internal("handle store corrupted");
        assert_eq!(error.to_string(), "Internal error: handle store corrupted");

        let error = PilumError::UnknownTask(7);
        assert_eq!(
            error.to_string(),
            "unknown task id 7 (never submitted or already retrieved)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error = PilumError::from(io_error);

        match error {
            PilumError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }
}
