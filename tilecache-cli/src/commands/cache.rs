//! Cache management CLI commands.

use std::path::Path;

use serde::Serialize;
use tilecache::cache::DiskEntryStore;

use super::common::{format_size, open_store};
use crate::error::CliError;

/// Disk cache statistics as printed by `stats --json`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DiskStats {
    pub directory: String,
    pub entries: u64,
    pub bytes: u64,
}

impl DiskStats {
    fn collect(store: &DiskEntryStore) -> Result<Self, CliError> {
        Ok(Self {
            directory: store.directory().display().to_string(),
            entries: store
                .entry_count()
                .map_err(|e| CliError::CacheStats(e.to_string()))?,
            bytes: store
                .size_bytes()
                .map_err(|e| CliError::CacheStats(e.to_string()))?,
        })
    }
}

/// Show disk cache statistics.
pub fn run_stats(cache_dir: &Path, json: bool) -> Result<(), CliError> {
    let store = open_store(cache_dir)?;
    let stats = DiskStats::collect(&store)?;

    if json {
        let out = serde_json::to_string_pretty(&stats)
            .map_err(|e| CliError::CacheStats(e.to_string()))?;
        println!("{}", out);
    } else {
        println!("Disk cache: {}", stats.directory);
        println!("  Entries: {}", stats.entries);
        println!("  Size:    {}", format_size(stats.bytes));
    }
    Ok(())
}

/// Clear the disk cache, removing all cached tiles.
pub fn run_clear(cache_dir: &Path) -> Result<(), CliError> {
    println!("Clearing disk cache at: {}", cache_dir.display());

    let store = open_store(cache_dir)?;
    let result = store
        .clear()
        .map_err(|e| CliError::CacheClear(e.to_string()))?;

    println!(
        "Deleted {} entries, freed {}",
        result.entries_removed,
        format_size(result.bytes_freed)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use tilecache::cache::{EntryStore, VALUE_COUNT};

    fn fill(store: &DiskEntryStore, key: &str) {
        let mut editor = store.edit(key).unwrap().unwrap();
        for index in 0..VALUE_COUNT {
            editor.new_output(index).unwrap().write_all(b"abcd").unwrap();
        }
        editor.commit().unwrap();
    }

    #[test]
    fn test_collect_stats() {
        let dir = TempDir::new().unwrap();
        let store = DiskEntryStore::open(dir.path(), VALUE_COUNT).unwrap();
        fill(&store, "0_0_1_tiles");
        fill(&store, "1_0_1_tiles");

        let stats = DiskStats::collect(&store).unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.bytes, 24);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["entries"], 2);
        assert_eq!(json["bytes"], 24);
    }

    #[test]
    fn test_clear_empties_store() {
        let dir = TempDir::new().unwrap();
        {
            let store = DiskEntryStore::open(dir.path(), VALUE_COUNT).unwrap();
            fill(&store, "0_0_1_tiles");
        }

        run_clear(dir.path()).unwrap();

        let store = DiskEntryStore::open(dir.path(), VALUE_COUNT).unwrap();
        assert_eq!(store.entry_count().unwrap(), 0);
    }
}
