//! Concurrent inverted index with two-level locking.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use log::debug;
use parking_lot::{RwLock, RwLockWriteGuard};

use crate::error::Result;

/// A normalized token extracted from a document.
pub type Word = String;

/// An opaque identifier for an indexed text source (e.g. a file path).
pub type Document = String;

/// The set of documents a word appears in.
pub type DocumentSet = HashSet<Document>;

/// An unshared word → document-set mapping built inside one batch task
/// before being merged into the shared index.
pub type PartialIndex = HashMap<Word, DocumentSet>;

/// A word's document set together with the lock that guards it. The slot is
/// created when the word is first inserted and dropped with its map entry,
/// so a per-word lock never outlives the word's presence in the map.
type Slot = Arc<RwLock<DocumentSet>>;

/// A word → document-set map safe for concurrent mutation from many worker
/// threads.
///
/// Locking is two-level: the outer `RwLock` (the map-structure lock) guards
/// insertion and removal of words, while each word's documents sit behind
/// their own `RwLock` inside the entry. Writers of *distinct* words run
/// concurrently; writers of the same word serialize; readers only block
/// while their word is being written. A separate registry tracks every
/// document the index has seen.
///
/// Within an operation the map-structure lock is acquired before any
/// word lock, and the registry lock is never held together with either.
///
/// # Examples
///
/// ```
/// use pilum::index::InvertedIndex;
///
/// let index = InvertedIndex::new();
/// index.add("anchor", "doc/a.txt");
/// index.add("anchor", "doc/b.txt");
///
/// assert!(index.contains("anchor"));
/// assert_eq!(index.find("anchor").len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct InvertedIndex {
    /// Word entries; the outer lock is the map-structure lock.
    entries: RwLock<HashMap<Word, Slot>>,

    /// Every document currently known to the index.
    documents: RwLock<DocumentSet>,
}

impl InvertedIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `word` appears in `document`.
    pub fn add(&self, word: &str, document: &str) {
        let docs: DocumentSet = std::iter::once(document.to_string()).collect();
        self.add_documents(word, &docs);
    }

    /// Merge a set of documents into `word`'s entry.
    pub fn add_documents(&self, word: &str, docs: &DocumentSet) {
        if docs.is_empty() {
            return;
        }

        {
            let entries = self.entries.read();
            match entries.get(word) {
                Some(slot) => {
                    // Holding the map read lock pins the entry in place
                    // while its set is mutated; other words stay free.
                    let mut set = slot.write();
                    set.extend(docs.iter().cloned());
                }
                None => {
                    drop(entries);

                    let mut entries = self.entries.write();
                    let slot = Arc::clone(entries.entry(word.to_string()).or_default());
                    let entries = RwLockWriteGuard::downgrade(entries);

                    let mut set = slot.write();
                    set.extend(docs.iter().cloned());
                    drop(set);
                    drop(entries);
                }
            }
        }

        // Word lock released above; registry is always last in lock order.
        let mut registry = self.documents.write();
        registry.extend(docs.iter().cloned());
    }

    /// Merge an entire partial index in one map-structure acquisition.
    ///
    /// All missing entries are created under a single write lock, which is
    /// then downgraded for the per-word merges.
    pub fn merge(&self, partial: &PartialIndex) {
        if partial.is_empty() {
            return;
        }

        {
            let mut entries = self.entries.write();
            for word in partial.keys() {
                entries.entry(word.clone()).or_default();
            }
            let entries = RwLockWriteGuard::downgrade(entries);

            for (word, docs) in partial {
                if let Some(slot) = entries.get(word) {
                    slot.write().extend(docs.iter().cloned());
                }
            }
        }

        let mut registry = self.documents.write();
        for docs in partial.values() {
            registry.extend(docs.iter().cloned());
        }
    }

    /// The documents `word` appears in; empty when the word is absent.
    pub fn find(&self, word: &str) -> DocumentSet {
        let entries = self.entries.read();

        match entries.get(word) {
            Some(slot) => slot.read().clone(),
            None => DocumentSet::new(),
        }
    }

    /// Whether `word` is present in the index.
    pub fn contains(&self, word: &str) -> bool {
        self.entries.read().contains_key(word)
    }

    /// Remove `word` and its documents entirely. No-op when absent.
    pub fn remove_word(&self, word: &str) {
        let mut entries = self.entries.write();

        if let Some(slot) = entries.remove(word) {
            // Stragglers still holding the slot see an empty set; the lock
            // itself is freed when the last reference drops.
            slot.write().clear();
        }
    }

    /// Strip `document` from every word's set and forget it in the
    /// registry; words left empty are removed entirely.
    ///
    /// The registry entry goes first (that lock is held alone, never
    /// together with word locks), then the scan strips the word sets under
    /// the map-structure write lock. This is an O(words) scan. A concurrent
    /// `add` of the same document wins the race: the document may reappear
    /// after this call returns.
    pub fn remove_document(&self, document: &str) {
        if !self.documents.write().remove(document) {
            return;
        }

        let mut entries = self.entries.write();
        entries.retain(|_, slot| {
            let mut set = slot.write();
            set.remove(document);
            !set.is_empty()
        });
    }

    /// Empty the index and the document registry.
    pub fn clear(&self) {
        {
            let mut entries = self.entries.write();
            for slot in entries.values() {
                slot.write().clear();
            }
            entries.clear();
        }

        self.documents.write().clear();
    }

    /// Number of words currently indexed.
    pub fn word_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the index has no words.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of documents in the registry.
    pub fn document_count(&self) -> usize {
        self.documents.read().len()
    }

    /// Return the document appearing under the greatest number of the given
    /// query words, or `None` when nothing matches.
    ///
    /// The score is the count of distinct query words the document appears
    /// under. Ties resolve to the lexicographically smallest document id,
    /// so results do not depend on hash iteration order.
    pub fn search(&self, words: &HashSet<Word>) -> Option<Document> {
        let mut tallies: HashMap<Document, usize> = HashMap::new();

        {
            let entries = self.entries.read();
            for word in words {
                if let Some(slot) = entries.get(word) {
                    for doc in slot.read().iter() {
                        *tallies.entry(doc.clone()).or_insert(0) += 1;
                    }
                }
            }
        }

        tallies
            .into_iter()
            .max_by(|(doc_a, count_a), (doc_b, count_b)| {
                count_a.cmp(count_b).then_with(|| doc_b.cmp(doc_a))
            })
            .map(|(doc, _)| doc)
    }

    /// Write the index to `path` as pretty-printed JSON: one key per word,
    /// each value the array of its document ids.
    ///
    /// The snapshot is taken under the map-structure read lock (each word
    /// under its read lock), so concurrent writers block until the copy is
    /// complete and the file reflects one consistent state.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot: HashMap<Word, Vec<Document>> = {
            let entries = self.entries.read();
            entries
                .iter()
                .map(|(word, slot)| {
                    let docs: Vec<Document> = slot.read().iter().cloned().collect();
                    (word.clone(), docs)
                })
                .collect()
        };

        debug!(
            "saving {} words to {}",
            snapshot.len(),
            path.as_ref().display()
        );

        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writer.flush()?;

        Ok(())
    }

    /// Rebuild an index from a file previously written by
    /// [`save`](Self::save).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let mapping: HashMap<Word, Vec<Document>> = serde_json::from_reader(BufReader::new(file))?;

        debug!(
            "loaded {} words from {}",
            mapping.len(),
            path.as_ref().display()
        );

        let index = InvertedIndex::new();
        for (word, docs) in mapping {
            let set: DocumentSet = docs.into_iter().collect();
            index.add_documents(&word, &set);
        }

        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn doc_set(docs: &[&str]) -> DocumentSet {
        docs.iter().map(|d| d.to_string()).collect()
    }

    fn word_set(words: &[&str]) -> HashSet<Word> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_add_single_document() {
        let index = InvertedIndex::new();
        index.add("example", "doc1");

        assert!(index.find("example").contains("doc1"));
        assert_eq!(index.document_count(), 1);
    }

    #[test]
    fn test_add_multiple_documents() {
        let index = InvertedIndex::new();
        index.add_documents("example", &doc_set(&["doc1", "doc2"]));

        let docs = index.find("example");
        assert!(docs.contains("doc1"));
        assert!(docs.contains("doc2"));
    }

    #[test]
    fn test_merge_partial_index() {
        let index = InvertedIndex::new();
        let mut partial = PartialIndex::new();
        partial.insert("word1".to_string(), doc_set(&["doc1", "doc2"]));
        partial.insert("word2".to_string(), doc_set(&["doc3"]));

        index.merge(&partial);

        for (word, docs) in &partial {
            let retrieved = index.find(word);
            for doc in docs {
                assert!(retrieved.contains(doc));
            }
        }
        assert_eq!(index.document_count(), 3);
    }

    #[test]
    fn test_find_absent_word_is_empty() {
        let index = InvertedIndex::new();
        assert!(index.find("missing").is_empty());
    }

    #[test]
    fn test_remove_word() {
        let index = InvertedIndex::new();
        index.add("example", "doc1");

        index.remove_word("example");

        assert!(!index.contains("example"));
        assert!(index.find("example").is_empty());
    }

    #[test]
    fn test_remove_word_absent_is_noop() {
        let index = InvertedIndex::new();
        index.remove_word("never-added");
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_document_strips_all_records() {
        let index = InvertedIndex::new();
        index.add("word1", "doc1");
        index.add("word1", "doc2");
        index.add("word2", "doc1");

        index.remove_document("doc1");

        assert_eq!(index.find("word1"), doc_set(&["doc2"]));
        // word2 only held doc1, so it disappears rather than staying empty.
        assert!(!index.contains("word2"));
        assert_eq!(index.document_count(), 1);
    }

    #[test]
    fn test_clear() {
        let index = InvertedIndex::new();
        index.add("example", "doc1");
        assert!(index.contains("example"));

        index.clear();

        assert!(!index.contains("example"));
        assert!(index.find("example").is_empty());
        assert_eq!(index.document_count(), 0);
    }

    #[test]
    fn test_search_no_overlap_breaks_tie_lexicographically() {
        let index = InvertedIndex::new();
        index.add("word1", "doc1");
        index.add("word2", "doc2");

        let result = index.search(&word_set(&["word1", "word2"]));

        // Both documents match one word; the smaller id wins.
        assert_eq!(result.as_deref(), Some("doc1"));
    }

    #[test]
    fn test_search_some_overlap() {
        let index = InvertedIndex::new();
        index.add("word1", "doc1");
        index.add("word1", "doc2");
        index.add("word2", "doc2");
        index.add("word3", "doc3");

        let result = index.search(&word_set(&["word1", "word2", "word3"]));

        assert_eq!(result.as_deref(), Some("doc2"));
    }

    #[test]
    fn test_search_all_overlapping() {
        let index = InvertedIndex::new();
        index.add("word1", "doc1");
        index.add("word2", "doc1");
        index.add("word3", "doc1");

        let result = index.search(&word_set(&["word1", "word2", "word3"]));

        assert_eq!(result.as_deref(), Some("doc1"));
    }

    #[test]
    fn test_search_nothing_matches() {
        let index = InvertedIndex::new();
        index.add("word1", "doc1");

        assert_eq!(index.search(&word_set(&["other"])), None);
        assert_eq!(index.search(&HashSet::new()), None);
    }

    #[test]
    fn test_concurrent_addition_same_word() {
        let index = Arc::new(InvertedIndex::new());
        let mut threads = Vec::new();

        for t in 0..10 {
            let index = Arc::clone(&index);
            threads.push(thread::spawn(move || {
                for i in 0..10 {
                    index.add("concurrent", &format!("doc{}", t * 10 + i));
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }

        assert_eq!(index.find("concurrent").len(), 100);
        assert_eq!(index.document_count(), 100);
    }

    #[test]
    fn test_concurrent_distinct_words() {
        let index = Arc::new(InvertedIndex::new());
        let mut threads = Vec::new();

        for t in 0..8 {
            let index = Arc::clone(&index);
            threads.push(thread::spawn(move || {
                let word = format!("word{t}");
                for i in 0..50 {
                    index.add(&word, &format!("doc{i}"));
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }

        for t in 0..8 {
            assert_eq!(index.find(&format!("word{t}")).len(), 50);
        }
    }

    #[test]
    fn test_concurrent_reads_and_writes() {
        let index = Arc::new(InvertedIndex::new());
        let mut threads = Vec::new();

        for _ in 0..10 {
            let index = Arc::clone(&index);
            threads.push(thread::spawn(move || {
                index.add("multithread", "doc_multi");
                index.contains("multithread");
                index.find("multithread");
                index.remove_document("doc_multi");
            }));
        }
        for t in threads {
            t.join().unwrap();
        }

        // Every thread's final action removes the one shared document, so
        // once all have joined the word must be gone.
        assert!(!index.contains("multithread"));
    }

    #[test]
    fn test_concurrent_word_removal() {
        let index = Arc::new(InvertedIndex::new());
        index.add("to_remove", "doc_remove");

        let mut threads = Vec::new();
        for _ in 0..10 {
            let index = Arc::clone(&index);
            threads.push(thread::spawn(move || index.remove_word("to_remove")));
        }
        for t in threads {
            t.join().unwrap();
        }

        assert!(!index.contains("to_remove"));
    }

    #[test]
    fn test_clear_after_concurrent_operations() {
        let index = Arc::new(InvertedIndex::new());
        let mut threads = Vec::new();

        for i in 0..10 {
            let index = Arc::clone(&index);
            threads.push(thread::spawn(move || {
                index.add(&format!("word{i}"), &format!("doc{i}"));
                if i % 2 == 0 {
                    index.remove_word(&format!("word{i}"));
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }

        index.clear();

        assert!(index.is_empty());
        assert!(!index.contains("word5"));
        assert!(index.find("word5").is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = InvertedIndex::new();
        index.add_documents("alpha", &doc_set(&["doc1", "doc2"]));
        index.add_documents("beta", &doc_set(&["doc2"]));
        index.save(&path).unwrap();

        let reloaded = InvertedIndex::load(&path).unwrap();

        assert_eq!(reloaded.word_count(), 2);
        assert_eq!(reloaded.find("alpha"), index.find("alpha"));
        assert_eq!(reloaded.find("beta"), index.find("beta"));
        assert_eq!(reloaded.document_count(), 2);
    }

    #[test]
    fn test_save_writes_json_object_of_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let index = InvertedIndex::new();
        index.add("gamma", "doc1");
        index.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();

        let docs = value
            .as_object()
            .and_then(|obj| obj.get("gamma"))
            .and_then(|v| v.as_array())
            .expect("word maps to an array");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].as_str(), Some("doc1"));
    }
}
