//! Transactional entry stores.
//!
//! The provider talks to storage only through the `EntryStore` trait. Two
//! implementations ship with the crate:
//!
//! - [`MemoryEntryStore`]: In-memory store with LRU bounding via moka
//! - [`DiskEntryStore`]: One directory per entry, committed by atomic rename
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tilecache::cache::store::{DiskEntryStore, EntryStore};
//! use tilecache::cache::codec::VALUE_COUNT;
//!
//! let store: Arc<dyn EntryStore> =
//!     Arc::new(DiskEntryStore::open("/var/cache/tiles", VALUE_COUNT)?);
//! # Ok::<(), tilecache::cache::store::StoreError>(())
//! ```

mod disk;
mod memory;
mod traits;

pub use disk::{ClearResult, DiskEntryStore, STAGING_DIR};
pub use memory::MemoryEntryStore;
pub use traits::{validate_key, EntryEditor, EntryStore, Snapshot, StoreError, MAX_KEY_LEN};
