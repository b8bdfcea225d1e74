//! On-disk entry store.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── .staging/           in-progress edits (removed on open)
//! │   └── <key>.XXXXXX/   one temp directory per live editor
//! └── <key>/              one directory per committed entry
//!     ├── 0
//!     ├── 1
//!     └── 2
//! ```
//!
//! An edit writes its sub-streams into a private temp directory. Commit
//! renames that directory to `<root>/<key>`, which is atomic on a single
//! filesystem, so readers see either the previous entry, no entry, or the
//! complete new one. Abandoned edits are cleaned up when the temp
//! directory is dropped.
//!
//! The store does no eviction or size accounting of its own.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;
use tempfile::TempDir;
use tracing::{debug, info, trace, warn};

use crate::cache::store::traits::{
    check_index, validate_key, EntryEditor, EntryStore, Snapshot, StoreError,
};

/// Name of the staging directory under the store root.
pub const STAGING_DIR: &str = ".staging";

/// Result of clearing a disk store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearResult {
    /// Number of entries removed.
    pub entries_removed: u64,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

/// Entry store persisting each entry as a directory of sub-stream files.
pub struct DiskEntryStore {
    root: PathBuf,
    staging: PathBuf,
    value_count: usize,
    /// Keys with a live editor in this process.
    editing: DashSet<String>,
    closed: AtomicBool,
}

impl DiskEntryStore {
    /// Open (or create) a store rooted at `root`.
    ///
    /// Any staging directories left behind by an earlier process are
    /// removed; committed entries are kept.
    ///
    /// # Arguments
    ///
    /// * `root` - Directory holding the store
    /// * `value_count` - Number of sub-streams per entry
    pub fn open(root: impl Into<PathBuf>, value_count: usize) -> Result<Self, StoreError> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);

        fs::create_dir_all(&root)?;
        if staging.exists() {
            debug!(path = %staging.display(), "Removing stale staging directory");
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        info!(path = %root.display(), value_count, "Opened disk entry store");

        Ok(Self {
            root,
            staging,
            value_count,
            editing: DashSet::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Root directory of the store.
    pub fn directory(&self) -> &Path {
        &self.root
    }

    /// Number of committed entries on disk.
    pub fn entry_count(&self) -> Result<u64, StoreError> {
        Ok(self.entry_dirs()?.len() as u64)
    }

    /// Total size of committed entries in bytes.
    pub fn size_bytes(&self) -> Result<u64, StoreError> {
        let mut total = 0;
        for dir in self.entry_dirs()? {
            total += dir_size(&dir)?;
        }
        Ok(total)
    }

    /// Remove every committed entry.
    ///
    /// Edits in progress are unaffected and may still commit afterwards.
    pub fn clear(&self) -> Result<ClearResult, StoreError> {
        let mut result = ClearResult::default();
        for dir in self.entry_dirs()? {
            let size = dir_size(&dir)?;
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    result.entries_removed += 1;
                    result.bytes_freed += size;
                }
                // Replaced or removed concurrently
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        info!(
            entries = result.entries_removed,
            bytes = result.bytes_freed,
            "Cleared disk entry store"
        );
        Ok(result)
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn entry_dirs(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut dirs = Vec::new();
        for item in fs::read_dir(&self.root)? {
            let item = item?;
            if item.file_name() == STAGING_DIR {
                continue;
            }
            if item.file_type()?.is_dir() {
                dirs.push(item.path());
            }
        }
        Ok(dirs)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}

impl EntryStore for DiskEntryStore {
    fn value_count(&self) -> usize {
        self.value_count
    }

    fn get(&self, key: &str) -> Result<Option<Snapshot>, StoreError> {
        self.ensure_open()?;
        validate_key(key)?;

        let dir = self.entry_dir(key);
        let mut readers = Vec::with_capacity(self.value_count);
        let mut first = None;
        for index in 0..self.value_count {
            let file = match File::open(dir.join(index.to_string())) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    if index > 0 {
                        trace!(key = %key, index, "Entry vanished while opening");
                    }
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };
            let meta = file.metadata()?;
            let len = meta.len();
            if first.is_none() {
                first = Some(meta);
            }
            let reader: Box<dyn Read + Send> = Box::new(BufReader::new(file));
            readers.push((reader, len));
        }

        // A commit between the opens above could pair sub-streams from two
        // generations; the first file must still be the one on disk.
        if let Some(first) = &first {
            if !is_current(first, &dir.join("0"))? {
                trace!(key = %key, "Entry replaced while opening");
                return Ok(None);
            }
        }

        Ok(Some(Snapshot::new(key, readers)))
    }

    fn edit(&self, key: &str) -> Result<Option<Box<dyn EntryEditor + '_>>, StoreError> {
        self.ensure_open()?;
        validate_key(key)?;

        if !self.editing.insert(key.to_string()) {
            trace!(key = %key, "Edit already in progress");
            return Ok(None);
        }

        let staging = match tempfile::Builder::new()
            .prefix(&format!("{}.", key))
            .tempdir_in(&self.staging)
        {
            Ok(dir) => dir,
            Err(e) => {
                self.editing.remove(key);
                return Err(e.into());
            }
        };

        Ok(Some(Box::new(DiskEditor {
            store: self,
            key: key.to_string(),
            staging,
            written: vec![false; self.value_count],
        })))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> Result<(), StoreError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(path = %self.root.display(), "Closed disk entry store");
        }
        Ok(())
    }
}

/// Editor staging sub-stream files in a temp directory until commit.
struct DiskEditor<'a> {
    store: &'a DiskEntryStore,
    key: String,
    staging: TempDir,
    written: Vec<bool>,
}

impl EntryEditor for DiskEditor<'_> {
    fn new_output(&mut self, index: usize) -> Result<Box<dyn Write + '_>, StoreError> {
        check_index(index, self.written.len())?;
        let file = File::create(self.staging.path().join(index.to_string()))?;
        self.written[index] = true;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.store.ensure_open()?;

        if let Some(index) = self.written.iter().position(|written| !written) {
            return Err(StoreError::IncompleteEntry {
                key: self.key.clone(),
                index,
            });
        }

        let target = self.store.entry_dir(&self.key);
        if target.exists() {
            // Move the old generation aside; it is deleted when `evicted` drops.
            let evicted = tempfile::Builder::new()
                .prefix("replaced.")
                .tempdir_in(&self.store.staging)?;
            match fs::rename(&target, evicted.path().join("entry")) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        fs::rename(self.staging.path(), &target)?;
        trace!(key = %self.key, "Committed entry");
        Ok(())
    }

    fn abort(self: Box<Self>) -> Result<(), StoreError> {
        // Dropping removes the staging directory and releases the key.
        Ok(())
    }
}

impl Drop for DiskEditor<'_> {
    fn drop(&mut self) {
        self.store.editing.remove(&self.key);
    }
}

/// Whether `path` still names the file `opened` was taken from.
#[cfg(unix)]
fn is_current(opened: &fs::Metadata, path: &Path) -> Result<bool, StoreError> {
    use std::os::unix::fs::MetadataExt;

    match fs::metadata(path) {
        Ok(now) => Ok(now.dev() == opened.dev() && now.ino() == opened.ino()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Whether `path` still names the file `opened` was taken from.
///
/// Without inode numbers, fall back to comparing size and modification time.
#[cfg(not(unix))]
fn is_current(opened: &fs::Metadata, path: &Path) -> Result<bool, StoreError> {
    match fs::metadata(path) {
        Ok(now) => Ok(now.len() == opened.len() && now.modified().ok() == opened.modified().ok()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

fn dir_size(dir: &Path) -> Result<u64, StoreError> {
    let mut total = 0;
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };
    for item in entries {
        let item = item?;
        match item.metadata() {
            Ok(meta) if meta.is_file() => total += meta.len(),
            Ok(_) => {}
            Err(e) => warn!(path = %item.path().display(), error = %e, "Failed to stat cache file"),
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store(dir: &TempDir) -> DiskEntryStore {
        DiskEntryStore::open(dir.path(), 3).unwrap()
    }

    fn write_entry(store: &DiskEntryStore, key: &str, values: [&[u8]; 3]) {
        let mut editor = store.edit(key).unwrap().unwrap();
        for (index, value) in values.iter().enumerate() {
            let mut out = editor.new_output(index).unwrap();
            out.write_all(value).unwrap();
            out.flush().unwrap();
        }
        editor.commit().unwrap();
    }

    fn read_all(snapshot: &mut Snapshot, index: usize) -> Vec<u8> {
        let mut out = Vec::new();
        snapshot
            .take_reader(index)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn test_open_creates_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("nested").join("cache");
        let store = DiskEntryStore::open(&root, 3).unwrap();

        assert_eq!(store.directory(), root.as_path());
        assert!(root.join(STAGING_DIR).is_dir());
        assert_eq!(store.entry_count().unwrap(), 0);
    }

    #[test]
    fn test_get_missing() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(store.get("3_5_10_mapA").unwrap().is_none());
    }

    #[test]
    fn test_commit_and_get() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        write_entry(&store, "k", [b"payload", b"hhhh", b"wwww"]);

        let mut snapshot = store.get("k").unwrap().unwrap();
        assert_eq!(snapshot.stream_len(0), Some(7));
        assert_eq!(read_all(&mut snapshot, 0), b"payload");
        assert_eq!(read_all(&mut snapshot, 1), b"hhhh");
        assert_eq!(read_all(&mut snapshot, 2), b"wwww");
    }

    #[test]
    fn test_entries_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir);
            write_entry(&store, "k", [b"persisted", b"1111", b"2222"]);
            store.close().unwrap();
        }

        let store = open_store(&dir);
        let mut snapshot = store.get("k").unwrap().unwrap();
        assert_eq!(read_all(&mut snapshot, 0), b"persisted");
    }

    #[test]
    fn test_open_removes_stale_staging() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join(STAGING_DIR).join("k.abc123");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("0"), b"half written").unwrap();

        let store = open_store(&dir);
        assert!(!stale.exists());
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_dropped_editor_leaves_entry_absent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        {
            let mut editor = store.edit("k").unwrap().unwrap();
            editor.new_output(0).unwrap().write_all(b"partial").unwrap();
        }

        assert!(store.get("k").unwrap().is_none());
        assert_eq!(
            fs::read_dir(dir.path().join(STAGING_DIR)).unwrap().count(),
            0
        );
        assert!(store.edit("k").unwrap().is_some());
    }

    #[test]
    fn test_incomplete_commit_refused() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let mut editor = store.edit("k").unwrap().unwrap();
        editor.new_output(0).unwrap().write_all(b"data").unwrap();

        let err = editor.commit().unwrap_err();
        assert!(matches!(err, StoreError::IncompleteEntry { index: 1, .. }));
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_second_editor_refused() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        let first = store.edit("k").unwrap();
        assert!(first.is_some());
        assert!(store.edit("k").unwrap().is_none());
        drop(first);
        assert!(store.edit("k").unwrap().is_some());
    }

    #[test]
    fn test_replace_existing() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        write_entry(&store, "k", [b"old", b"1111", b"1111"]);
        let mut before = store.get("k").unwrap().unwrap();

        write_entry(&store, "k", [b"new", b"2222", b"2222"]);

        let mut after = store.get("k").unwrap().unwrap();
        assert_eq!(read_all(&mut after, 0), b"new");
        assert_eq!(store.entry_count().unwrap(), 1);

        // Files opened by the earlier snapshot stay readable on Unix
        #[cfg(unix)]
        assert_eq!(read_all(&mut before, 0), b"old");
        #[cfg(not(unix))]
        let _ = &mut before;
    }

    #[test]
    fn test_is_current_detects_replacement() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        write_entry(&store, "k", [b"old", b"1111", b"1111"]);

        let path = dir.path().join("k").join("0");
        let opened = File::open(&path).unwrap().metadata().unwrap();
        assert!(is_current(&opened, &path).unwrap());

        // Replacing the entry after the first open invalidates the handle
        write_entry(&store, "k", [b"newer", b"2222", b"2222"]);
        assert!(!is_current(&opened, &path).unwrap());

        fs::remove_dir_all(dir.path().join("k")).unwrap();
        assert!(!is_current(&opened, &path).unwrap());
    }

    #[test]
    fn test_missing_substream_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        write_entry(&store, "k", [b"data", b"1111", b"2222"]);
        fs::remove_file(dir.path().join("k").join("2")).unwrap();

        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_stats_and_clear() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        write_entry(&store, "a", [&[0u8; 1000], b"1111", b"2222"]);
        write_entry(&store, "b", [&[0u8; 2000], b"1111", b"2222"]);

        assert_eq!(store.entry_count().unwrap(), 2);
        assert_eq!(store.size_bytes().unwrap(), 3016);

        let result = store.clear().unwrap();
        assert_eq!(
            result,
            ClearResult {
                entries_removed: 2,
                bytes_freed: 3016
            }
        );
        assert_eq!(store.entry_count().unwrap(), 0);
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn test_closed_store_refuses_access() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.close().unwrap();

        assert!(store.is_closed());
        assert!(matches!(store.get("k"), Err(StoreError::Closed)));
        assert!(matches!(store.edit("k"), Err(StoreError::Closed)));
    }

    #[test]
    fn test_invalid_key_rejected() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        assert!(matches!(store.get(".."), Err(StoreError::InvalidKey(_))));
        assert!(matches!(
            store.edit(STAGING_DIR),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
