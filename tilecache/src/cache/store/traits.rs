//! Core traits for the transactional entry store.
//!
//! An `EntryStore` maps string keys to entries made of a fixed number of
//! independent byte sub-streams. Writes go through an `EntryEditor`, which
//! stages every sub-stream and only makes the entry visible on `commit`.
//!
//! # Design Principles
//!
//! - **String keys**: Human-readable for debugging, restricted to
//!   `[A-Za-z0-9_-]{1,120}` so disk stores can use them as file names
//! - **Named sub-streams**: Each entry carries `value_count()` byte streams
//!   addressed by index
//! - **All-or-nothing writes**: An edit is either committed in full or
//!   never observed by readers
//! - **One writer per key**: A second `edit()` for a key with a live editor
//!   returns `Ok(None)` instead of blocking
//! - **Dyn-compatible**: Providers hold `Arc<dyn EntryStore>` so one store
//!   can be shared by many callers
//!
//! # Example
//!
//! ```
//! use std::io::{Read, Write};
//! use tilecache::cache::store::{EntryStore, MemoryEntryStore};
//!
//! let store = MemoryEntryStore::new(2, 1024 * 1024);
//!
//! let mut editor = store.edit("greeting").unwrap().unwrap();
//! editor.new_output(0).unwrap().write_all(b"hello").unwrap();
//! editor.new_output(1).unwrap().write_all(b"world").unwrap();
//! editor.commit().unwrap();
//!
//! let mut snapshot = store.get("greeting").unwrap().unwrap();
//! let mut first = String::new();
//! snapshot.take_reader(0).unwrap().read_to_string(&mut first).unwrap();
//! assert_eq!(first, "hello");
//! ```

use std::io::{Read, Write};
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Maximum key length accepted by stores.
pub const MAX_KEY_LEN: usize = 120;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error during store operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store has been closed.
    #[error("Store is closed")]
    Closed,

    /// Key does not match `[A-Za-z0-9_-]{1,120}`.
    #[error("Invalid key '{0}'")]
    InvalidKey(String),

    /// Sub-stream index outside `0..value_count`.
    #[error("Sub-stream index {index} out of range (entries have {count} values)")]
    InvalidIndex { index: usize, count: usize },

    /// Commit attempted before every sub-stream was written.
    #[error("Entry '{key}' is missing sub-stream {index}")]
    IncompleteEntry { key: String, index: usize },
}

/// A point-in-time view of one committed entry.
///
/// All sub-stream readers are opened when the snapshot is created, so a
/// snapshot keeps returning the generation it was taken from even if the
/// entry is replaced afterwards.
pub struct Snapshot {
    key: String,
    readers: Vec<Option<Box<dyn Read + Send>>>,
    lengths: Vec<u64>,
}

impl Snapshot {
    /// Create a snapshot from already-opened sub-stream readers.
    pub fn new(key: impl Into<String>, readers: Vec<(Box<dyn Read + Send>, u64)>) -> Self {
        let (readers, lengths) = readers
            .into_iter()
            .map(|(reader, len)| (Some(reader), len))
            .unzip();
        Self {
            key: key.into(),
            readers,
            lengths,
        }
    }

    /// The key this snapshot was read from.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of sub-streams in the entry.
    pub fn value_count(&self) -> usize {
        self.readers.len()
    }

    /// Length in bytes of sub-stream `index`, if it exists.
    pub fn stream_len(&self, index: usize) -> Option<u64> {
        self.lengths.get(index).copied()
    }

    /// Take ownership of the reader for sub-stream `index`.
    ///
    /// Each reader can be taken once; a second call for the same index
    /// returns `None`, as does an out-of-range index.
    pub fn take_reader(&mut self, index: usize) -> Option<Box<dyn Read + Send>> {
        self.readers.get_mut(index).and_then(Option::take)
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("key", &self.key)
            .field("lengths", &self.lengths)
            .finish()
    }
}

/// An in-progress, uncommitted write to one entry.
///
/// Dropping an editor without calling `commit` abandons the edit and
/// releases the key for other writers.
pub trait EntryEditor: Send {
    /// Open a writer for sub-stream `index`, truncating anything staged
    /// for it earlier in this edit.
    ///
    /// The writer must be dropped before `commit` is called.
    fn new_output(&mut self, index: usize) -> Result<Box<dyn Write + '_>, StoreError>;

    /// Publish every staged sub-stream as one entry.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::IncompleteEntry` if a sub-stream was never
    /// written; the entry stays absent in that case.
    fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discard every staged sub-stream.
    fn abort(self: Box<Self>) -> Result<(), StoreError>;
}

/// Transactional key-value store with multi-stream entries.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`; a single store is typically
/// shared by several providers and rendering threads.
pub trait EntryStore: Send + Sync {
    /// Number of sub-streams in every entry.
    fn value_count(&self) -> usize;

    /// Read the committed entry for `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(snapshot))` if a complete entry exists
    /// - `Ok(None)` if the key has no committed entry
    /// - `Err(_)` on I/O failure, invalid key, or a closed store
    fn get(&self, key: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Begin an edit of `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(editor))` if this caller now owns the key's edit
    /// - `Ok(None)` if another editor for the key is still live
    /// - `Err(_)` on I/O failure, invalid key, or a closed store
    fn edit(&self, key: &str) -> Result<Option<Box<dyn EntryEditor + '_>>, StoreError>;

    /// Whether `close` has been called.
    fn is_closed(&self) -> bool;

    /// Close the store. Subsequent reads and edits fail with
    /// `StoreError::Closed`. Closing twice is not an error.
    fn close(&self) -> Result<(), StoreError>;
}

/// Pattern every store key must match.
fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,120}$").unwrap())
}

/// Check a key against `[A-Za-z0-9_-]{1,120}`.
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    if key_pattern().is_match(key) {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Check a sub-stream index against a store's value count.
pub(crate) fn check_index(index: usize, count: usize) -> Result<(), StoreError> {
    if index < count {
        Ok(())
    } else {
        Err(StoreError::InvalidIndex { index, count })
    }
}
