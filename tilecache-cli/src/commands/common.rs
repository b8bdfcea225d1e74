//! Common types and utilities shared across CLI commands.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::{ImageFormat, Rgb, RgbImage};
use tilecache::cache::{CachedTileProvider, DiskEntryStore, VALUE_COUNT};
use tilecache::config::ConfigFile;
use tilecache::tile::{Tile, TileGenerator, TileGeneratorError, TileRequest};

use crate::error::CliError;

/// Highest zoom level accepted by the pattern generator.
pub const MAX_ZOOM: i32 = 24;

/// Edge length of generated tiles in pixels.
pub const TILE_SIZE: u32 = 256;

/// Built-in generator rendering a checkerboard PNG per tile.
///
/// The square color is derived from the coordinates so neighboring tiles
/// are visually distinct.
pub struct PatternTileGenerator {
    size: u32,
}

impl PatternTileGenerator {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl Default for PatternTileGenerator {
    fn default() -> Self {
        Self::new(TILE_SIZE)
    }
}

impl TileGenerator for PatternTileGenerator {
    fn generate(&self, request: &TileRequest) -> Result<Tile, TileGeneratorError> {
        let (x, y, zoom) = (request.x(), request.y(), request.zoom());
        let limit = 1i64 << zoom.clamp(0, MAX_ZOOM);
        if !(0..=MAX_ZOOM).contains(&zoom)
            || !(0..limit).contains(&(x as i64))
            || !(0..limit).contains(&(y as i64))
        {
            return Err(TileGeneratorError::InvalidCoordinates { x, y, zoom });
        }

        let tint = [
            (x.wrapping_mul(67) & 0xff) as u8,
            (y.wrapping_mul(131) & 0xff) as u8,
            (zoom.wrapping_mul(29) & 0xff) as u8,
        ];
        let square = (self.size / 8).max(1);
        let image = RgbImage::from_fn(self.size, self.size, |px, py| {
            if (px / square + py / square) % 2 == 0 {
                Rgb(tint)
            } else {
                Rgb([255 - tint[0], 255 - tint[1], 255 - tint[2]])
            }
        });

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| TileGeneratorError::GenerationFailed(e.to_string()))?;

        Ok(Tile::new(self.size, self.size, png.into_inner())?)
    }
}

/// Open the disk store at `directory`.
pub fn open_store(directory: &Path) -> Result<Arc<DiskEntryStore>, CliError> {
    let store = DiskEntryStore::open(directory, VALUE_COUNT)
        .map_err(|e| CliError::StoreOpen(format!("{}: {}", directory.display(), e)))?;
    Ok(Arc::new(store))
}

/// Build a provider over the configured disk store and the pattern generator.
///
/// `tag` overrides the configured namespace tag.
pub fn open_provider(
    config: &ConfigFile,
    tag: Option<&str>,
) -> Result<CachedTileProvider, CliError> {
    let store = open_store(&config.cache.directory)?;
    let tag = tag.unwrap_or(&config.cache.tag);
    Ok(CachedTileProvider::new(
        tag,
        Arc::new(PatternTileGenerator::default()),
        store,
    )?)
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
