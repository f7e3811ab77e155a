//! CLI command execution logic.

use std::path::PathBuf;

use log::info;

use crate::analysis::DocumentParser;
use crate::cli::args::{Command, IndexArgs, PilumArgs, QueryArgs};
use crate::error::Result;
use crate::index::InvertedIndex;
use crate::indexer::{Indexer, IndexerConfig};

/// Execute the parsed command line.
pub fn execute_command(args: PilumArgs) -> Result<()> {
    match args.command {
        Command::Index(index_args) => execute_index(index_args),
        Command::Query(query_args) => execute_query(query_args),
    }
}

/// Build the normalization pipeline shared by both subcommands.
fn build_parser(stop_words: Option<&PathBuf>, no_defaults: bool) -> Result<DocumentParser> {
    let mut parser = if no_defaults {
        DocumentParser::new()
    } else {
        DocumentParser::with_default_stop_words()
    };

    if let Some(path) = stop_words {
        let loaded = parser.register_stop_words(path)?;
        info!("loaded {loaded} stop words from {}", path.display());
    }

    Ok(parser)
}

fn execute_index(args: IndexArgs) -> Result<()> {
    let parser = build_parser(args.stop_words.as_ref(), args.no_default_stop_words)?;

    let config = IndexerConfig {
        worker_threads: args.threads.unwrap_or_else(num_cpus::get),
        mode: args.mode,
    };

    let indexer = Indexer::new(config, parser)?;
    let report = indexer.run(&args.input_dir, &args.output_file)?;

    println!(
        "Indexed {} files across {} directories in {:?}",
        report.files_processed, report.directories_scanned, report.execution_time
    );
    println!("Index written to {}", args.output_file.display());

    if let Some(query) = &args.query {
        print_match(indexer.query(query));
    }

    indexer.shutdown();

    Ok(())
}

fn execute_query(args: QueryArgs) -> Result<()> {
    let parser = build_parser(args.stop_words.as_ref(), args.no_default_stop_words)?;
    let index = InvertedIndex::load(&args.index_file)?;

    let words = parser.parse_words(&args.query);
    print_match(index.search(&words));

    Ok(())
}

fn print_match(result: Option<String>) {
    match result {
        Some(document) => println!("Best match: {document}"),
        None => println!("No document matches the query"),
    }
}
