//! Persistent tile cache.
//!
//! The cache wraps a `TileGenerator` with a transactional `EntryStore`,
//! translating tile coordinates into keys and tiles into three-stream
//! entries.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              CachedTileProvider               │
//! │                                               │
//! │  (x, y, zoom) + tag → CacheKey                │
//! │  Tile ⇄ StagedEntry (payload/height/width)    │
//! │  miss or error → generator, best-effort fill  │
//! └──────────────┬─────────────────────┬──────────┘
//!                │                     │
//!                ▼                     ▼
//! ┌──────────────────────────┐ ┌───────────────────────┐
//! │   Arc<dyn EntryStore>    │ │ Arc<dyn TileGenerator>│
//! │ get / edit / commit      │ │ generate(&TileRequest)│
//! └──────────────────────────┘ └───────────────────────┘
//! ```
//!
//! # Key Format
//!
//! `{x}_{y}_{zoom}_{tag}`, e.g. `3_5_10_mapA`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tilecache::cache::{CachedTileProvider, MemoryEntryStore, VALUE_COUNT};
//! use tilecache::tile::{Tile, TileGenerator, TileGeneratorError, TileRequest};
//!
//! struct Checker;
//!
//! impl TileGenerator for Checker {
//!     fn generate(&self, request: &TileRequest) -> Result<Tile, TileGeneratorError> {
//!         Ok(Tile::new(256, 256, vec![(request.x() ^ request.y()) as u8; 64])?)
//!     }
//! }
//!
//! let store = Arc::new(MemoryEntryStore::new(VALUE_COUNT, 64 * 1024 * 1024));
//! let provider = CachedTileProvider::new("mapA", Arc::new(Checker), store).unwrap();
//!
//! let tile = provider.get_tile(3, 5, 10).unwrap(); // generated and cached
//! let again = provider.get_tile(3, 5, 10).unwrap(); // served from the store
//! assert_eq!(tile, again);
//! assert_eq!(provider.stats().hits, 1);
//! ```

pub mod codec;
pub mod key;
mod provider;
mod stats;
pub mod store;

pub use codec::{StagedEntry, VALUE_COUNT};
pub use key::{CacheKey, KeyError, TileTag};
pub use provider::{CachedTileProvider, PrewarmReport, ProviderError, TileSource};
pub use stats::ProviderStatsSnapshot;
pub use store::{DiskEntryStore, EntryStore, MemoryEntryStore, StoreError};
