//! Concurrent inverted index.
//!
//! Maps each normalized word to the set of documents it appears in. The
//! structure uses two-level locking (a map-structure lock plus one lock per
//! word) so that operations on distinct words proceed concurrently while
//! insertion and removal of words stay structurally consistent. See
//! [`InvertedIndex`] for the lock protocol.

pub mod inverted;

pub use inverted::{Document, DocumentSet, InvertedIndex, PartialIndex, Word};
