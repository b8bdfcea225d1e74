//! `get` command: fetch one tile through the cache.

use std::fs;
use std::path::Path;

use tilecache::cache::TileSource;
use tilecache::config::ConfigFile;
use tilecache::tile::TileRequest;

use super::common::{format_size, open_provider};
use crate::error::CliError;

/// Fetch a tile, report where it came from and optionally save its payload.
pub fn run(
    config: &ConfigFile,
    request: TileRequest,
    tag: Option<&str>,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let provider = open_provider(config, tag)?;
    let (tile, source) = provider.fetch(&request)?;

    let origin = match source {
        TileSource::Cache => "cache hit",
        TileSource::Generator => "generated",
    };
    println!(
        "Tile {} ({}x{}, {}): {}",
        provider.cache_key(request.x(), request.y(), request.zoom()),
        tile.width(),
        tile.height(),
        format_size(tile.data().len() as u64),
        origin
    );

    if let Some(path) = output {
        fs::write(path, tile.data())?;
        println!("Wrote {}", path.display());
    }

    provider.close_cache()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_writes_png() {
        let dir = TempDir::new().unwrap();
        let mut config = ConfigFile::default();
        config.cache.directory = dir.path().join("cache");
        let output = dir.path().join("tile.png");

        run(&config, TileRequest::new(1, 1, 2), Some("test"), Some(&output)).unwrap();

        let bytes = fs::read(&output).unwrap();
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
        assert!(dir.path().join("cache").join("1_1_2_test").is_dir());
    }

    #[test]
    fn test_get_invalid_coordinates() {
        let dir = TempDir::new().unwrap();
        let mut config = ConfigFile::default();
        config.cache.directory = dir.path().to_path_buf();

        let err = run(&config, TileRequest::new(9, 0, 1), None, None).unwrap_err();
        assert!(matches!(err, CliError::Tile(_)));
    }
}
