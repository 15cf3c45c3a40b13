//! Loads and saves `<music_root>/.collection_index.json`.

use crate::core::errors::LibraryError;
use crate::core::logging::log_index_update;
use crate::domain::models::{now_iso8601, CollectionIndex, CollectionInsight};
use crate::storage::atomic::AtomicStore;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

const INDEX_FILE_NAME: &str = ".collection_index.json";

struct CachedIndex {
    mtime: SystemTime,
    index: CollectionIndex,
}

/// Manages the collection-wide catalog. Serves `load` from a short-lived
/// process-local cache invalidated by the file's mtime (spec §4.5).
#[derive(Default)]
pub struct CollectionIndexStore {
    atomic: AtomicStore,
    cache: Mutex<Option<CachedIndex>>,
}

impl CollectionIndexStore {
    pub fn new() -> Self {
        Self {
            atomic: AtomicStore::new(),
            cache: Mutex::new(None),
        }
    }

    pub fn index_path(&self, music_root: &Path) -> PathBuf {
        music_root.join(INDEX_FILE_NAME)
    }

    /// Load the collection index, or an empty one if it has never been written.
    pub fn load_collection_index(&self, music_root: &Path) -> Result<CollectionIndex, LibraryError> {
        let path = self.index_path(music_root);
        if !self.atomic.file_exists(&path) {
            return Ok(CollectionIndex::empty());
        }

        let mtime = fs::metadata(&path)?.modified()?;
        {
            let cache = self.cache.lock().unwrap();
            if let Some(cached) = cache.as_ref() {
                if cached.mtime == mtime {
                    return Ok(cached.index.clone());
                }
            }
        }

        let index: CollectionIndex = self.atomic.load(&path)?;
        *self.cache.lock().unwrap() = Some(CachedIndex {
            mtime,
            index: index.clone(),
        });
        Ok(index)
    }

    /// Recompute `stats`, advance `last_scan`, and write atomically with backup.
    pub fn update_collection_index(
        &self,
        music_root: &Path,
        mut index: CollectionIndex,
    ) -> Result<CollectionIndex, LibraryError> {
        index.last_scan = now_iso8601();
        index.recompute_stats();
        let path = self.index_path(music_root);
        self.atomic.save(&path, &index, true)?;
        log_index_update(index.bands.len());
        *self.cache.lock().unwrap() = None;
        Ok(index)
    }

    /// Replace `insights` on the current (or empty) index and save.
    pub fn save_collection_insight(
        &self,
        music_root: &Path,
        insight: CollectionInsight,
    ) -> Result<(), LibraryError> {
        let mut index = self.load_collection_index(music_root)?;
        index.insights = Some(insight);
        self.update_collection_index(music_root, index)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BandIndexEntry, CollectionStats};
    use tempfile::tempdir;

    fn sample_entry(name: &str, local: usize, missing: usize) -> BandIndexEntry {
        BandIndexEntry {
            name: name.to_string(),
            folder_path: name.to_string(),
            albums_count: local + missing,
            local_albums_count: local,
            missing_albums_count: missing,
            has_metadata: true,
            has_analysis: false,
            last_updated: now_iso8601(),
            structure_type: None,
            compliance_score: None,
            album_type_distribution: None,
        }
    }

    #[test]
    fn update_recomputes_stats() {
        let dir = tempdir().unwrap();
        let store = CollectionIndexStore::new();
        let mut index = CollectionIndex::empty();
        index.bands.push(sample_entry("Radiohead", 3, 1));
        index.stats = CollectionStats::default();

        let saved = store.update_collection_index(dir.path(), index).unwrap();
        assert_eq!(saved.stats.total_bands, 1);
        assert_eq!(saved.stats.total_local_albums, 3);
        assert_eq!(saved.stats.total_missing_albums, 1);
        assert!((saved.stats.completion_percentage - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn load_missing_file_returns_empty_index() {
        let dir = tempdir().unwrap();
        let store = CollectionIndexStore::new();
        let index = store.load_collection_index(dir.path()).unwrap();
        assert!(index.bands.is_empty());
    }

    #[test]
    fn load_after_update_round_trips() {
        let dir = tempdir().unwrap();
        let store = CollectionIndexStore::new();
        let mut index = CollectionIndex::empty();
        index.bands.push(sample_entry("Sigur Ros", 2, 0));
        store.update_collection_index(dir.path(), index).unwrap();

        let loaded = store.load_collection_index(dir.path()).unwrap();
        assert_eq!(loaded.bands.len(), 1);
        assert_eq!(loaded.bands[0].name, "Sigur Ros");
    }
}
