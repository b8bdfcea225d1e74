//! Integration tests for the cached tile provider over the disk store.
//!
//! These tests verify the complete flow including:
//! - generate → persist → decode round trips through real files
//! - tag isolation between providers sharing one store
//! - pass-through behavior after the store is closed
//! - partial-write safety and concurrent access
//!
//! Run with: `cargo test --test provider_integration`

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use tilecache::cache::store::STAGING_DIR;
use tilecache::cache::{
    CachedTileProvider, DiskEntryStore, EntryStore, TileSource, VALUE_COUNT,
};
use tilecache::tile::{Tile, TileGenerator, TileGeneratorError, TileRequest};

// ============================================================================
// Helper Functions
// ============================================================================

/// Deterministic generator with a call counter.
///
/// Payload is `N` bytes `0..N` with `N` derived from the coordinate, so
/// every tile differs.
struct SequenceGenerator {
    calls: AtomicUsize,
}

impl SequenceGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn payload_len(request: &TileRequest) -> usize {
        64 + (request.x().unsigned_abs() as usize * 7 + request.y().unsigned_abs() as usize) % 512
    }
}

impl TileGenerator for SequenceGenerator {
    fn generate(&self, request: &TileRequest) -> Result<Tile, TileGeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.zoom() < 0 {
            return Err(TileGeneratorError::InvalidCoordinates {
                x: request.x(),
                y: request.y(),
                zoom: request.zoom(),
            });
        }
        let data = (0..Self::payload_len(request)).map(|i| i as u8).collect();
        Ok(Tile::new(256, 256, data)?)
    }
}

fn open_store(dir: &TempDir) -> Arc<DiskEntryStore> {
    Arc::new(DiskEntryStore::open(dir.path(), VALUE_COUNT).unwrap())
}

// ============================================================================
// Integration Tests
// ============================================================================

/// First request generates and persists, second is served from disk.
#[test]
fn test_end_to_end_generate_then_hit() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let generator = SequenceGenerator::new();
    let provider = CachedTileProvider::new("mapA", generator.clone(), store.clone()).unwrap();

    let first = provider.get_tile(3, 5, 10).unwrap();
    assert_eq!(generator.calls(), 1);
    assert_eq!(first.width(), 256);
    assert_eq!(first.height(), 256);
    assert!(first.data().iter().enumerate().all(|(i, b)| *b == i as u8));

    // Entry is on disk in the expected layout
    let entry_dir = dir.path().join("3_5_10_mapA");
    assert_eq!(std::fs::read(entry_dir.join("0")).unwrap(), first.data());
    assert_eq!(std::fs::read(entry_dir.join("1")).unwrap(), 256i32.to_be_bytes());
    assert_eq!(std::fs::read(entry_dir.join("2")).unwrap(), 256i32.to_be_bytes());

    let second = provider.get_tile(3, 5, 10).unwrap();
    assert_eq!(generator.calls(), 1);
    assert_eq!(second, first);
}

/// A key that was never persisted is absent from the store.
#[test]
fn test_miss_before_fill() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let provider = CachedTileProvider::new("mapA", SequenceGenerator::new(), store.clone()).unwrap();

    let key = provider.cache_key(9, 9, 9);
    assert!(store.get(key.as_str()).unwrap().is_none());
}

/// Cached tiles survive closing and reopening the store.
#[test]
fn test_cache_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let original = {
        let store = open_store(&dir);
        let provider =
            CachedTileProvider::new("mapA", SequenceGenerator::new(), store.clone()).unwrap();
        let tile = provider.get_tile(-2, 7, 4).unwrap();
        provider.close_cache().unwrap();
        tile
    };

    let generator = SequenceGenerator::new();
    let provider = CachedTileProvider::new("mapA", generator.clone(), open_store(&dir)).unwrap();
    let (tile, source) = provider.fetch(&TileRequest::new(-2, 7, 4)).unwrap();

    assert_eq!(source, TileSource::Cache);
    assert_eq!(tile, original);
    assert_eq!(generator.calls(), 0);
}

/// Providers with different tags never read each other's entries.
#[test]
fn test_tag_isolation_on_shared_store() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let gen_a = SequenceGenerator::new();
    let gen_b = SequenceGenerator::new();
    let provider_a = CachedTileProvider::new("mapA", gen_a.clone(), store.clone()).unwrap();
    let provider_b = CachedTileProvider::new("mapB", gen_b.clone(), store.clone()).unwrap();

    provider_a.get_tile(3, 5, 10).unwrap();
    provider_b.get_tile(3, 5, 10).unwrap();
    provider_a.get_tile(3, 5, 10).unwrap();
    provider_b.get_tile(3, 5, 10).unwrap();

    assert_eq!(gen_a.calls(), 1);
    assert_eq!(gen_b.calls(), 1);
    assert_eq!(store.entry_count().unwrap(), 2);
}

/// After close, requests still succeed through the generator.
#[test]
fn test_closed_store_degrades_to_generator() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let generator = SequenceGenerator::new();
    let provider = CachedTileProvider::new("mapA", generator.clone(), store.clone()).unwrap();

    provider.get_tile(1, 1, 1).unwrap();
    provider.close_cache().unwrap();

    for _ in 0..3 {
        let tile = provider.get_tile(1, 1, 1).unwrap();
        assert_eq!(tile.width(), 256);
    }
    assert_eq!(generator.calls(), 4);

    // A second provider sharing the closed store behaves the same way
    let other = CachedTileProvider::new("mapB", SequenceGenerator::new(), store).unwrap();
    assert!(other.get_tile(2, 2, 2).is_ok());
}

/// An edit abandoned after writing only the payload never becomes visible.
#[test]
fn test_interrupted_write_is_not_a_hit() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let generator = SequenceGenerator::new();
    let provider = CachedTileProvider::new("mapA", generator.clone(), store.clone()).unwrap();
    let key = provider.cache_key(3, 5, 10);

    {
        let mut editor = store.edit(key.as_str()).unwrap().unwrap();
        editor
            .new_output(0)
            .unwrap()
            .write_all(b"half an entry")
            .unwrap();
        // Dropped before commit
    }

    assert!(store.get(key.as_str()).unwrap().is_none());
    let tile = provider.get_tile(3, 5, 10).unwrap();
    assert_eq!(generator.calls(), 1);
    assert!(tile.data().starts_with(&[0, 1, 2, 3]));
}

/// Staging files from a crashed process are discarded on open.
#[test]
fn test_crash_leftovers_are_discarded() {
    let dir = TempDir::new().unwrap();
    let leftover = dir.path().join(STAGING_DIR).join("3_5_10_mapA.crash");
    std::fs::create_dir_all(&leftover).unwrap();
    std::fs::write(leftover.join("0"), b"payload only").unwrap();

    let generator = SequenceGenerator::new();
    let provider = CachedTileProvider::new("mapA", generator.clone(), open_store(&dir)).unwrap();

    provider.get_tile(3, 5, 10).unwrap();
    assert_eq!(generator.calls(), 1);
    assert!(!leftover.exists());
}

/// Generator errors reach the caller; nothing is cached for them.
#[test]
fn test_generator_error_not_cached() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let generator = SequenceGenerator::new();
    let provider = CachedTileProvider::new("mapA", generator.clone(), store.clone()).unwrap();

    for _ in 0..2 {
        let err = provider.get_tile(0, 0, -1).unwrap_err();
        assert!(matches!(err, TileGeneratorError::InvalidCoordinates { .. }));
    }
    assert_eq!(generator.calls(), 2);
    assert_eq!(store.entry_count().unwrap(), 0);
}

/// Many threads requesting overlapping tiles all get correct results.
#[test]
fn test_concurrent_requests() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let generator = SequenceGenerator::new();
    let provider = Arc::new(CachedTileProvider::new("mapA", generator.clone(), store.clone()).unwrap());

    thread::scope(|scope| {
        for worker in 0..8 {
            let provider = Arc::clone(&provider);
            scope.spawn(move || {
                for i in 0..20 {
                    let x = (worker + i) % 5;
                    let request = TileRequest::new(x, 1, 3);
                    let tile = provider.get_tile(x, 1, 3).unwrap();
                    assert_eq!(tile.data().len(), SequenceGenerator::payload_len(&request));
                }
            });
        }
    });

    // Five distinct tiles; duplicates only from lost races
    assert!(generator.calls() >= 5);
    assert_eq!(store.entry_count().unwrap(), 5);

    let stats = provider.stats();
    assert_eq!(stats.hits + stats.misses, 160);
    assert_eq!(stats.store_failed, 0);
}

/// Prewarming fills the store so later requests are hits.
#[test]
fn test_prewarm_then_serve() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let generator = SequenceGenerator::new();
    let provider = CachedTileProvider::new("mapA", generator.clone(), store.clone()).unwrap();

    let requests: Vec<TileRequest> = (0..3)
        .flat_map(|x| (0..3).map(move |y| TileRequest::new(x, y, 5)))
        .collect();
    let report = provider.prewarm(&requests);
    assert_eq!(report.generated, 9);
    assert_eq!(store.entry_count().unwrap(), 9);

    for request in &requests {
        let (_, source) = provider.fetch(request).unwrap();
        assert_eq!(source, TileSource::Cache);
    }
    assert_eq!(generator.calls(), 9);
}
