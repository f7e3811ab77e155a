//! Text analysis: turning raw document bytes into normalized words.
//!
//! The pipeline is intentionally small: alphabetic-run tokenization,
//! case-folding, Porter stemming, stop-word removal. Both index
//! construction and the query path go through [`DocumentParser`] so that
//! queries are normalized exactly like indexed text.

pub mod parser;
pub mod stemmer;

pub use parser::{DEFAULT_ENGLISH_STOP_WORDS, DocumentParser};
pub use stemmer::PorterStemmer;
