//! In-memory entry store using moka.
//!
//! Committed entries live in a `moka::sync::Cache` weighted by their total
//! byte size, so the store stays bounded and evicts least-recently-used
//! entries on its own. Edits in progress are tracked in a `DashSet`, which
//! gives the one-writer-per-key rule without a global lock.
//!
//! Mainly useful for tests and for short-lived processes that want the
//! provider's fallback behavior without touching the disk.

use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashSet;
use moka::sync::Cache as MokaCache;
use tracing::trace;

use crate::cache::store::traits::{
    check_index, validate_key, EntryEditor, EntryStore, Snapshot, StoreError,
};

type StoredEntry = Arc<Vec<Vec<u8>>>;

/// In-memory entry store.
///
/// Provides the same transactional semantics as the disk store, with
/// automatic LRU eviction once `max_size_bytes` is exceeded.
pub struct MemoryEntryStore {
    /// Committed entries.
    entries: MokaCache<String, StoredEntry>,

    /// Keys with a live editor.
    editing: DashSet<String>,

    value_count: usize,

    max_size_bytes: u64,

    closed: AtomicBool,
}

impl MemoryEntryStore {
    /// Create a new memory store.
    ///
    /// # Arguments
    ///
    /// * `value_count` - Number of sub-streams per entry
    /// * `max_size_bytes` - Maximum total size of committed entries
    pub fn new(value_count: usize, max_size_bytes: u64) -> Self {
        let entries = MokaCache::builder()
            // Weight each entry by its data size
            .weigher(|_key: &String, value: &StoredEntry| -> u32 {
                let size: usize = value.iter().map(Vec::len).sum();
                // moka uses u32 for weights, cap at u32::MAX for very large entries
                size.min(u32::MAX as usize) as u32
            })
            .max_capacity(max_size_bytes)
            .build();

        Self {
            entries,
            editing: DashSet::new(),
            value_count,
            max_size_bytes,
            closed: AtomicBool::new(false),
        }
    }

    /// Current number of committed entries.
    pub fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Current total size of committed entries in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.weighted_size()
    }

    /// Configured maximum size in bytes.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl EntryStore for MemoryEntryStore {
    fn value_count(&self) -> usize {
        self.value_count
    }

    fn get(&self, key: &str) -> Result<Option<Snapshot>, StoreError> {
        self.ensure_open()?;
        validate_key(key)?;

        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };

        let readers = entry
            .iter()
            .map(|value| {
                let len = value.len() as u64;
                let reader: Box<dyn Read + Send> = Box::new(Cursor::new(value.clone()));
                (reader, len)
            })
            .collect();

        Ok(Some(Snapshot::new(key, readers)))
    }

    fn edit(&self, key: &str) -> Result<Option<Box<dyn EntryEditor + '_>>, StoreError> {
        self.ensure_open()?;
        validate_key(key)?;

        if !self.editing.insert(key.to_string()) {
            trace!(key = %key, "Edit already in progress");
            return Ok(None);
        }

        Ok(Some(Box::new(MemoryEditor {
            store: self,
            key: key.to_string(),
            staged: vec![None; self.value_count],
        })))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> Result<(), StoreError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.entries.invalidate_all();
        }
        Ok(())
    }
}

/// Editor staging sub-streams in memory until commit.
struct MemoryEditor<'a> {
    store: &'a MemoryEntryStore,
    key: String,
    staged: Vec<Option<Vec<u8>>>,
}

impl EntryEditor for MemoryEditor<'_> {
    fn new_output(&mut self, index: usize) -> Result<Box<dyn Write + '_>, StoreError> {
        check_index(index, self.staged.len())?;
        let slot = self.staged[index].insert(Vec::new());
        Ok(Box::new(slot))
    }

    fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        self.store.ensure_open()?;

        let staged = std::mem::take(&mut self.staged);
        let mut values = Vec::with_capacity(staged.len());
        for (index, value) in staged.into_iter().enumerate() {
            match value {
                Some(bytes) => values.push(bytes),
                None => {
                    return Err(StoreError::IncompleteEntry {
                        key: self.key.clone(),
                        index,
                    })
                }
            }
        }

        self.store
            .entries
            .insert(self.key.clone(), Arc::new(values));
        Ok(())
    }

    fn abort(self: Box<Self>) -> Result<(), StoreError> {
        // Dropping releases the key; staged bytes go with it.
        Ok(())
    }
}

impl Drop for MemoryEditor<'_> {
    fn drop(&mut self) {
        self.store.editing.remove(&self.key);
    }
}
