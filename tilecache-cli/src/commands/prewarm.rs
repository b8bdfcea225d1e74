//! `prewarm` command: fill the cache for a rectangle of tiles.

use std::time::Instant;

use tilecache::config::ConfigFile;
use tilecache::tile::TileRequest;
use tracing::info;

use super::common::{open_provider, MAX_ZOOM};
use crate::error::CliError;

/// Largest number of tiles a single prewarm run accepts.
pub const MAX_PREWARM_TILES: u64 = 1 << 20;

/// Inclusive tile rectangle at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: i32,
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl TileRange {
    /// Number of tiles in the rectangle, after checking it is valid.
    ///
    /// The zoom must be in `0..=MAX_ZOOM`, both corners inside the
    /// `2^zoom` grid, and the tile count at most [`MAX_PREWARM_TILES`].
    pub fn tile_count(&self) -> Result<u64, CliError> {
        if !(0..=MAX_ZOOM).contains(&self.zoom) {
            return Err(CliError::InvalidArgs(format!(
                "zoom {} outside 0..={}",
                self.zoom, MAX_ZOOM
            )));
        }
        if self.x0 > self.x1 || self.y0 > self.y1 {
            return Err(CliError::InvalidArgs(format!(
                "empty range x {}..={} y {}..={}",
                self.x0, self.x1, self.y0, self.y1
            )));
        }

        let limit = 1i64 << self.zoom;
        let inside = |v: i32| (0..limit).contains(&i64::from(v));
        if ![self.x0, self.y0, self.x1, self.y1].into_iter().all(inside) {
            return Err(CliError::InvalidArgs(format!(
                "range x {}..={} y {}..={} outside the zoom {} grid (0..{})",
                self.x0, self.x1, self.y0, self.y1, self.zoom, limit
            )));
        }

        let width = (i64::from(self.x1) - i64::from(self.x0) + 1) as u64;
        let height = (i64::from(self.y1) - i64::from(self.y0) + 1) as u64;
        let count = width * height;
        if count > MAX_PREWARM_TILES {
            return Err(CliError::InvalidArgs(format!(
                "{} tiles requested, at most {} per prewarm",
                count, MAX_PREWARM_TILES
            )));
        }
        Ok(count)
    }

    /// Expand the rectangle into requests, row by row.
    pub fn requests(&self) -> Result<Vec<TileRequest>, CliError> {
        let count = self.tile_count()?;
        let zoom = self.zoom;
        let mut requests = Vec::with_capacity(count as usize);
        requests.extend(
            (self.y0..=self.y1)
                .flat_map(|y| (self.x0..=self.x1).map(move |x| TileRequest::new(x, y, zoom))),
        );
        Ok(requests)
    }
}

/// Generate and cache every tile in `range`.
pub fn run(config: &ConfigFile, range: TileRange, tag: Option<&str>) -> Result<(), CliError> {
    let requests = range.requests()?;
    let provider = open_provider(config, tag)?;

    println!(
        "Prewarming {} tiles at zoom {} (tag {})",
        requests.len(),
        range.zoom,
        provider.tag()
    );
    let started = Instant::now();
    let report = provider.prewarm(&requests);
    let elapsed = started.elapsed();

    info!(
        cached = report.cached,
        generated = report.generated,
        failed = report.failed,
        elapsed_ms = elapsed.as_millis() as u64,
        "Prewarm finished"
    );
    println!(
        "  Already cached: {}\n  Generated:      {}\n  Failed:         {}\n  Time:           {:.2}s",
        report.cached,
        report.generated,
        report.failed,
        elapsed.as_secs_f64()
    );

    provider.close_cache()?;
    Ok(())
}
