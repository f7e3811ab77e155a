//! Command line argument parsing for the pilum CLI using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::indexer::ProcessingMode;

/// Pilum - build and query an inverted index over a directory of text files
#[derive(Parser, Debug, Clone)]
#[command(name = "pilum")]
#[command(about = "Build and query an inverted index over a directory of text files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct PilumArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl PilumArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build an index over a directory tree
    Index(IndexArgs),

    /// Resolve a query against a saved index
    Query(QueryArgs),
}

/// Arguments for building an index
#[derive(Parser, Debug, Clone)]
pub struct IndexArgs {
    /// Directory to index recursively
    #[arg(value_name = "INPUT_DIR")]
    pub input_dir: PathBuf,

    /// Path of the JSON index file to write
    #[arg(value_name = "OUTPUT_FILE")]
    pub output_file: PathBuf,

    /// Batching policy for file processing
    #[arg(short, long, value_enum, default_value = "per-file")]
    pub mode: ProcessingMode,

    /// Worker thread count (defaults to the number of CPUs)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Stop-word list to load before parsing
    #[arg(long, value_name = "FILE")]
    pub stop_words: Option<PathBuf>,

    /// Skip the built-in English stop-word list
    #[arg(long)]
    pub no_default_stop_words: bool,

    /// Resolve this query against the freshly built index
    #[arg(long, value_name = "TEXT")]
    pub query: Option<String>,
}

/// Arguments for querying a saved index
#[derive(Parser, Debug, Clone)]
pub struct QueryArgs {
    /// Saved JSON index file to load
    #[arg(value_name = "INDEX_FILE")]
    pub index_file: PathBuf,

    /// Query text
    #[arg(value_name = "TEXT")]
    pub query: String,

    /// Stop-word list to apply to the query
    #[arg(long, value_name = "FILE")]
    pub stop_words: Option<PathBuf>,

    /// Skip the built-in English stop-word list
    #[arg(long)]
    pub no_default_stop_words: bool,
}
