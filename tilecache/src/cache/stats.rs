//! Provider statistics.
//!
//! Counters are lock-free atomics updated on every request. Take a
//! [`ProviderStatsSnapshot`] to read a consistent-enough point-in-time copy
//! for logs or CLI output.
//!
//! ```text
//! CachedTileProvider ─────► ProviderStats ─────► ProviderStatsSnapshot
//!                           (atomic counters)    (point-in-time copy)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters for one provider.
#[derive(Debug, Default)]
pub(crate) struct ProviderStats {
    hits: AtomicU64,
    misses: AtomicU64,
    lookup_errors: AtomicU64,
    generated: AtomicU64,
    generator_failures: AtomicU64,
    stored: AtomicU64,
    store_skipped: AtomicU64,
    store_failed: AtomicU64,
}

impl ProviderStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A lookup failed and was treated as a miss.
    pub(crate) fn record_lookup_error(&self) {
        self.lookup_errors.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_generated(&self) {
        self.generated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_generator_failure(&self) {
        self.generator_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_skipped(&self) {
        self.store_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_store_failed(&self) {
        self.store_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of every counter.
    pub(crate) fn snapshot(&self) -> ProviderStatsSnapshot {
        ProviderStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            lookup_errors: self.lookup_errors.load(Ordering::Relaxed),
            generated: self.generated.load(Ordering::Relaxed),
            generator_failures: self.generator_failures.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            store_skipped: self.store_skipped.load(Ordering::Relaxed),
            store_failed: self.store_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ProviderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProviderStatsSnapshot {
    /// Requests served from the store.
    pub hits: u64,
    /// Requests that had to call the generator (includes lookup errors).
    pub misses: u64,
    /// Lookups that failed with a store or decode error.
    pub lookup_errors: u64,
    /// Tiles produced by the generator.
    pub generated: u64,
    /// Generator calls that returned an error.
    pub generator_failures: u64,
    /// Entries committed to the store.
    pub stored: u64,
    /// Persist attempts skipped (store closed or key busy).
    pub store_skipped: u64,
    /// Persist attempts that failed and were aborted.
    pub store_failed: u64,
}

impl ProviderStatsSnapshot {
    /// Fraction of requests served from the store, `0.0` with no requests.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl fmt::Display for ProviderStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} ({:.1}% hit rate), generated={}, stored={}, skipped={}, failed={}",
            self.hits,
            self.misses,
            self.hit_rate() * 100.0,
            self.generated,
            self.stored,
            self.store_skipped,
            self.store_failed
        )
    }
}
