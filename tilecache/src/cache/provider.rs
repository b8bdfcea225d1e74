//! Tile provider with a persistent cache in front of a generator.
//!
//! This provider wraps a `TileGenerator` and an `EntryStore` with:
//! - Key translation: `(x, y, zoom)` + tag → `"{x}_{y}_{zoom}_{tag}"`
//! - Entry encoding: payload, height and width as three sub-streams
//! - Fallback: any cache problem degrades to calling the generator
//! - Statistics: hit/miss and persist outcome counters
//!
//! # Failure Handling
//!
//! Store and decode errors never reach the caller. A failed lookup is
//! logged and handled as a miss; a failed persist is logged and the edit is
//! abandoned so no partial entry becomes visible. Only generator errors are
//! returned from [`CachedTileProvider::get_tile`].

use std::io::Write;
use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::cache::codec::{self, CodecError, StagedEntry, VALUE_COUNT};
use crate::cache::key::{CacheKey, KeyError, TileTag};
use crate::cache::stats::{ProviderStats, ProviderStatsSnapshot};
use crate::cache::store::{EntryEditor, EntryStore, StoreError};
use crate::tile::{Tile, TileGenerator, TileGeneratorError, TileRequest};

/// Errors constructing a `CachedTileProvider`.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The namespace tag is not usable in a key.
    #[error(transparent)]
    InvalidTag(#[from] KeyError),

    /// The store's entries do not have one sub-stream per tile field.
    #[error("Store entries have {actual} sub-streams, tile entries need {expected}")]
    ValueCountMismatch { expected: usize, actual: usize },
}

/// Cache-layer failure, kept for logging and never returned to callers.
#[derive(Debug, Error)]
enum CacheError {
    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("codec: {0}")]
    Codec(#[from] CodecError),
}

/// Outcome of reading one key.
enum Lookup {
    Hit(Tile),
    Miss,
    Error(CacheError),
}

/// Outcome of a best-effort persist.
enum Persist {
    Stored,
    Skipped(&'static str),
    Failed(CacheError),
}

/// Where a returned tile came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSource {
    /// Decoded from a committed cache entry.
    Cache,
    /// Produced by the generator on this call.
    Generator,
}

/// Summary of a [`CachedTileProvider::prewarm`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrewarmReport {
    /// Tiles that were already cached.
    pub cached: usize,
    /// Tiles produced by the generator.
    pub generated: usize,
    /// Tiles the generator failed to produce.
    pub failed: usize,
}

impl PrewarmReport {
    fn merge(self, other: Self) -> Self {
        Self {
            cached: self.cached + other.cached,
            generated: self.generated + other.generated,
            failed: self.failed + other.failed,
        }
    }

    /// Total number of requests processed.
    pub fn total(&self) -> usize {
        self.cached + self.generated + self.failed
    }
}

/// Tile provider caching generated tiles in an `EntryStore`.
///
/// One store can be shared by several providers; each provider's `tag`
/// keeps its entries apart. The provider never closes the store on its
/// own; call [`close_cache`](Self::close_cache) explicitly.
pub struct CachedTileProvider {
    /// Namespace for this provider's keys.
    tag: TileTag,

    /// Source of tiles on a miss.
    generator: Arc<dyn TileGenerator>,

    /// Shared persistent store.
    store: Arc<dyn EntryStore>,

    stats: ProviderStats,
}

impl CachedTileProvider {
    /// Create a new caching provider.
    ///
    /// # Arguments
    ///
    /// * `tag` - Namespace for this provider's entries, from `[A-Za-z0-9_-]`
    /// * `generator` - Tile source used on cache misses
    /// * `store` - Store holding cached entries, shared by reference
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` if the tag is invalid or the store does not
    /// hold three sub-streams per entry.
    pub fn new(
        tag: impl Into<String>,
        generator: Arc<dyn TileGenerator>,
        store: Arc<dyn EntryStore>,
    ) -> Result<Self, ProviderError> {
        let tag = TileTag::new(tag)?;
        let actual = store.value_count();
        if actual != VALUE_COUNT {
            return Err(ProviderError::ValueCountMismatch {
                expected: VALUE_COUNT,
                actual,
            });
        }
        Ok(Self {
            tag,
            generator,
            store,
            stats: ProviderStats::new(),
        })
    }

    /// The namespace tag of this provider.
    pub fn tag(&self) -> &TileTag {
        &self.tag
    }

    /// The key this provider uses for a coordinate.
    pub fn cache_key(&self, x: i32, y: i32, zoom: i32) -> CacheKey {
        CacheKey::new(x, y, zoom, &self.tag)
    }

    /// Load a tile.
    ///
    /// If cached, the tile is decoded from the store. Otherwise it is
    /// generated, added to the store on a best-effort basis, and returned.
    ///
    /// # Errors
    ///
    /// Only generator errors are returned. Cache failures fall back to
    /// the generator.
    pub fn get_tile(&self, x: i32, y: i32, zoom: i32) -> Result<Tile, TileGeneratorError> {
        self.fetch(&TileRequest::new(x, y, zoom))
            .map(|(tile, _)| tile)
    }

    /// Load a tile and report whether it came from the cache.
    pub fn fetch(&self, request: &TileRequest) -> Result<(Tile, TileSource), TileGeneratorError> {
        let key = self.cache_key(request.x(), request.y(), request.zoom());

        match self.lookup(&key) {
            Lookup::Hit(tile) => {
                self.stats.record_hit();
                debug!(key = %key, "Cache hit for tile");
                return Ok((tile, TileSource::Cache));
            }
            Lookup::Miss => {
                self.stats.record_miss();
                trace!(key = %key, "Cache miss for tile");
            }
            Lookup::Error(e) => {
                self.stats.record_lookup_error();
                warn!(key = %key, error = %e, "Tile cache lookup failed, regenerating");
            }
        }

        let tile = match self.generator.generate(request) {
            Ok(tile) => tile,
            Err(e) => {
                self.stats.record_generator_failure();
                return Err(e);
            }
        };
        self.stats.record_generated();

        match self.persist(&key, &tile) {
            Persist::Stored => {
                self.stats.record_stored();
                debug!(key = %key, bytes = tile.data().len(), "Added tile to cache");
            }
            Persist::Skipped(reason) => {
                self.stats.record_store_skipped();
                debug!(key = %key, reason, "Tile not cached");
            }
            Persist::Failed(e) => {
                self.stats.record_store_failed();
                warn!(key = %key, error = %e, "Tile cache write failed");
            }
        }

        Ok((tile, TileSource::Generator))
    }

    /// Make sure every requested tile is cached, generating in parallel.
    ///
    /// Generator failures are counted in the report rather than returned.
    pub fn prewarm(&self, requests: &[TileRequest]) -> PrewarmReport {
        let report = requests
            .par_iter()
            .map(|request| match self.fetch(request) {
                Ok((_, TileSource::Cache)) => PrewarmReport {
                    cached: 1,
                    ..Default::default()
                },
                Ok((_, TileSource::Generator)) => PrewarmReport {
                    generated: 1,
                    ..Default::default()
                },
                Err(e) => {
                    debug!(
                        x = request.x(),
                        y = request.y(),
                        zoom = request.zoom(),
                        error = %e,
                        "Prewarm generation failed"
                    );
                    PrewarmReport {
                        failed: 1,
                        ..Default::default()
                    }
                }
            })
            .reduce(PrewarmReport::default, PrewarmReport::merge);

        info!(
            tag = %self.tag,
            cached = report.cached,
            generated = report.generated,
            failed = report.failed,
            "Prewarm complete"
        );
        report
    }

    /// Close the underlying store.
    ///
    /// Afterwards every `get_tile` call goes straight to the generator,
    /// for this provider and for any other provider sharing the store.
    pub fn close_cache(&self) -> Result<(), StoreError> {
        info!(tag = %self.tag, "Closing tile cache");
        self.store.close()
    }

    /// Current request statistics.
    pub fn stats(&self) -> ProviderStatsSnapshot {
        self.stats.snapshot()
    }

    fn lookup(&self, key: &CacheKey) -> Lookup {
        if self.store.is_closed() {
            return Lookup::Miss;
        }

        let mut snapshot = match self.store.get(key.as_str()) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Lookup::Miss,
            // Closed after the check above
            Err(StoreError::Closed) => return Lookup::Miss,
            Err(e) => return Lookup::Error(e.into()),
        };

        match codec::decode(&mut snapshot) {
            Ok(tile) => Lookup::Hit(tile),
            Err(e) => Lookup::Error(e.into()),
        }
    }

    fn persist(&self, key: &CacheKey, tile: &Tile) -> Persist {
        if self.store.is_closed() {
            return Persist::Skipped("store closed");
        }

        let staged = match StagedEntry::encode(tile) {
            Ok(staged) => staged,
            Err(e) => return Persist::Failed(e.into()),
        };

        let editor = match self.store.edit(key.as_str()) {
            Ok(Some(editor)) => editor,
            Ok(None) => return Persist::Skipped("edit in progress"),
            Err(StoreError::Closed) => return Persist::Skipped("store closed"),
            Err(e) => return Persist::Failed(e.into()),
        };

        let mut guard = EditGuard::new(editor);
        for (index, bytes) in staged.streams() {
            if let Err(e) = guard.write_stream(index, bytes) {
                return Persist::Failed(e.into());
            }
        }

        match guard.commit() {
            Ok(()) => Persist::Stored,
            // Closed after the edit was opened
            Err(StoreError::Closed) => Persist::Skipped("store closed"),
            Err(e) => Persist::Failed(e.into()),
        }
    }
}

/// Scoped owner of an editor that aborts it unless committed.
struct EditGuard<'a> {
    editor: Option<Box<dyn EntryEditor + 'a>>,
}

impl<'a> EditGuard<'a> {
    fn new(editor: Box<dyn EntryEditor + 'a>) -> Self {
        Self {
            editor: Some(editor),
        }
    }

    /// Write one sub-stream; the writer is closed on every path.
    fn write_stream(&mut self, index: usize, bytes: &[u8]) -> Result<(), StoreError> {
        let Some(editor) = self.editor.as_mut() else {
            return Ok(());
        };
        let mut out = editor.new_output(index)?;
        out.write_all(bytes)?;
        out.flush()?;
        Ok(())
    }

    fn commit(mut self) -> Result<(), StoreError> {
        match self.editor.take() {
            Some(editor) => editor.commit(),
            None => Ok(()),
        }
    }
}

impl Drop for EditGuard<'_> {
    fn drop(&mut self) {
        if let Some(editor) = self.editor.take() {
            if let Err(e) = editor.abort() {
                debug!(error = %e, "Failed to abort cache edit");
            }
        }
    }
}
