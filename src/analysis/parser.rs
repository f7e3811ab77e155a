//! Document parsing: raw bytes → set of normalized words.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use log::warn;

use crate::analysis::stemmer::PorterStemmer;
use crate::error::{PilumError, Result};
use crate::index::Word;

/// Default English stop words list.
///
/// Common English words that are typically filtered out during indexing.
pub const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Default English stop words as a HashSet.
static DEFAULT_ENGLISH_STOP_WORDS_SET: LazyLock<HashSet<String>> = LazyLock::new(|| {
    DEFAULT_ENGLISH_STOP_WORDS
        .iter()
        .map(|&s| s.to_string())
        .collect()
});

/// Turns document text into the set of normalized words the index stores.
///
/// Normalization is: split into alphabetic-only runs, case-fold, stem with
/// [`PorterStemmer`], drop stop words. Stop words are compared against the
/// *stemmed* token, so a list should contain the surface forms that survive
/// stemming.
///
/// The same pipeline is used at index-build time and at query time, so a
/// query matches exactly the tokens that were indexed.
///
/// # Examples
///
/// ```
/// use pilum::analysis::DocumentParser;
///
/// let parser = DocumentParser::with_default_stop_words();
/// let words = parser.parse_words("The runner was running!");
///
/// assert!(words.contains("runner"));
/// assert!(words.contains("run"));
/// assert!(!words.contains("the"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DocumentParser {
    stop_words: HashSet<String>,
    stemmer: PorterStemmer,
}

impl DocumentParser {
    /// Create a parser with no stop words registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a parser preloaded with the default English stop words.
    pub fn with_default_stop_words() -> Self {
        DocumentParser {
            stop_words: DEFAULT_ENGLISH_STOP_WORDS_SET.clone(),
            stemmer: PorterStemmer::new(),
        }
    }

    /// Load additional stop words from a text file.
    ///
    /// The file is split on non-alphabetic characters and case-folded, the
    /// same segmentation used for documents. Returns the number of words
    /// newly added.
    pub fn register_stop_words<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PilumError::analysis(format!("cannot read stop-word file {}: {e}", path.display()))
        })?;

        let mut loaded = 0;
        for token in segment_alphabetic(&content) {
            if self.stop_words.insert(token) {
                loaded += 1;
            }
        }

        Ok(loaded)
    }

    /// Whether `word` is registered as a stop word.
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Number of registered stop words.
    pub fn stop_word_count(&self) -> usize {
        self.stop_words.len()
    }

    /// Normalize `text` into its set of indexable words.
    pub fn parse_words(&self, text: &str) -> HashSet<Word> {
        let mut words = HashSet::new();

        for token in segment_alphabetic(text) {
            let stemmed = self.stemmer.stem(&token);
            if !self.stop_words.contains(&stemmed) {
                words.insert(stemmed);
            }
        }

        words
    }

    /// Read `path` and normalize its contents.
    ///
    /// An unreadable file is logged and contributes no words; one bad file
    /// never aborts the batch it belongs to. Non-UTF-8 bytes are replaced
    /// rather than rejected.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> HashSet<Word> {
        let path = path.as_ref();

        match fs::read(path) {
            Ok(bytes) => self.parse_words(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                warn!("skipping unreadable file {}: {e}", path.display());
                HashSet::new()
            }
        }
    }
}

/// Split `text` into lowercased alphabetic-only runs.
fn segment_alphabetic(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphabetic() {
            current.extend(ch.to_lowercase());
            continue;
        }
        if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
