//! Loads and saves the per-band metadata file, preserving user-authored
//! fields across refreshes.

use crate::core::errors::LibraryError;
use crate::core::logging::{log_metadata_load_recovered, log_metadata_save};
use crate::domain::models::{now_iso8601, BandAnalysis, BandMetadata};
use crate::storage::atomic::AtomicStore;
use crate::CollectionIndex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

const METADATA_FILE_NAME: &str = ".band_metadata.json";

/// Result summary returned by `save_band_metadata`.
#[derive(Debug, Clone, Serialize)]
pub struct SaveMetadataSummary {
    pub band_name: String,
    pub albums_count: usize,
    pub file_path: String,
    pub timestamp: String,
}

/// Manages `<music_root>/<band_folder>/.band_metadata.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BandMetadataStore {
    atomic: AtomicStore,
}

impl BandMetadataStore {
    pub fn new() -> Self {
        Self {
            atomic: AtomicStore::new(),
        }
    }

    pub fn metadata_path(&self, band_dir: &Path) -> PathBuf {
        band_dir.join(METADATA_FILE_NAME)
    }

    /// Load per-band metadata if present, migrating the legacy single-array
    /// shape transparently. Returns `Ok(None)` if no file exists yet.
    pub fn load_band_metadata(&self, band_dir: &Path) -> Result<Option<BandMetadata>, LibraryError> {
        let path = self.metadata_path(band_dir);
        if !self.atomic.file_exists(&path) {
            return Ok(None);
        }
        let mut metadata: BandMetadata = self.atomic.load(&path)?;
        metadata.migrate_legacy_shape();
        Ok(Some(metadata))
    }

    /// Save `incoming` metadata for `band_dir`, preserve-merging any
    /// `analyze`/`folder_structure` the caller didn't explicitly carry.
    pub fn save_band_metadata(
        &self,
        band_dir: &Path,
        mut incoming: BandMetadata,
    ) -> Result<SaveMetadataSummary, LibraryError> {
        let path = self.metadata_path(band_dir);

        match self.load_band_metadata(band_dir) {
            Ok(Some(existing)) => {
                if incoming.analyze.is_none() {
                    incoming.analyze = existing.analyze;
                }
                if incoming.folder_structure.is_none() {
                    incoming.folder_structure = existing.folder_structure;
                }
            }
            Ok(None) => {}
            Err(e) => {
                log_metadata_load_recovered(band_dir, &e);
            }
        }

        incoming.sync_albums_count();
        incoming.validate_invariants()?;

        let now = now_iso8601();
        incoming.last_updated = now.clone();
        incoming.last_metadata_saved = Some(now.clone());

        let result = self.atomic.save(&path, &incoming, true);
        log_metadata_save(&incoming.band_name, result.is_ok());
        result?;

        Ok(SaveMetadataSummary {
            band_name: incoming.band_name,
            albums_count: incoming.albums_count,
            file_path: path.to_string_lossy().to_string(),
            timestamp: now,
        })
    }

    /// Load or create metadata for `band_name`, reconcile `analysis`'s
    /// similar-bands lists against `index`, and save.
    pub fn save_band_analyze(
        &self,
        band_dir: &Path,
        band_name: &str,
        mut analysis: BandAnalysis,
        index: &CollectionIndex,
    ) -> Result<BandAnalysis, LibraryError> {
        let mut metadata = self
            .load_band_metadata(band_dir)?
            .unwrap_or_else(|| BandMetadata::new(band_name));

        let known: HashSet<String> = index
            .bands
            .iter()
            .map(|b| b.name.to_lowercase())
            .collect();

        let mut combined: Vec<String> = analysis.similar_bands.clone();
        for name in &analysis.similar_bands_missing {
            if !combined.iter().any(|n| n.eq_ignore_ascii_case(name)) {
                combined.push(name.clone());
            }
        }

        let mut present = Vec::new();
        let mut missing = Vec::new();
        for name in combined {
            if known.contains(&name.to_lowercase()) {
                present.push(name);
            } else {
                missing.push(name);
            }
        }
        analysis.similar_bands = present;
        analysis.similar_bands_missing = missing;
        analysis.validate()?;

        metadata.analyze = Some(analysis.clone());
        metadata.last_updated = now_iso8601();

        self.atomic.save(&self.metadata_path(band_dir), &metadata, true)?;
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Album, AlbumAnalysis, BandIndexEntry};
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = BandMetadataStore::new();
        let mut metadata = BandMetadata::new("Radiohead");
        metadata.albums.push(Album::new("OK Computer"));
        store.save_band_metadata(dir.path(), metadata).unwrap();

        let loaded = store.load_band_metadata(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.band_name, "Radiohead");
        assert_eq!(loaded.albums.len(), 1);
        assert_eq!(loaded.albums_count, 1);
    }

    #[test]
    fn preserve_merge_keeps_analyze_across_refresh() {
        let dir = tempdir().unwrap();
        let store = BandMetadataStore::new();

        let mut metadata = BandMetadata::new("Radiohead");
        metadata.analyze = Some(BandAnalysis {
            review: "great band".into(),
            rate: 9,
            albums: vec![AlbumAnalysis {
                album_name: "OK Computer".into(),
                review: "masterpiece".into(),
                rate: 10,
            }],
            similar_bands: vec![],
            similar_bands_missing: vec![],
        });
        store.save_band_metadata(dir.path(), metadata).unwrap();

        let refreshed = BandMetadata::new("Radiohead");
        store.save_band_metadata(dir.path(), refreshed).unwrap();

        let loaded = store.load_band_metadata(dir.path()).unwrap().unwrap();
        let analyze = loaded.analyze.expect("analyze should be preserved");
        assert_eq!(analyze.review, "great band");
        assert_eq!(analyze.rate, 9);
    }

    #[test]
    fn save_band_analyze_reconciles_similar_bands() {
        let dir = tempdir().unwrap();
        let store = BandMetadataStore::new();
        let mut index = CollectionIndex::empty();
        index.bands.push(BandIndexEntry {
            name: "Sigur Ros".into(),
            folder_path: "Sigur Ros".into(),
            albums_count: 0,
            local_albums_count: 0,
            missing_albums_count: 0,
            has_metadata: true,
            has_analysis: false,
            last_updated: now_iso8601(),
            structure_type: None,
            compliance_score: None,
            album_type_distribution: None,
        });

        let analysis = BandAnalysis {
            review: "ambient".into(),
            rate: 7,
            albums: vec![],
            similar_bands: vec!["sigur ros".into(), "Unknown Band".into()],
            similar_bands_missing: vec![],
        };

        let reconciled = store
            .save_band_analyze(dir.path(), "Test Band", analysis, &index)
            .unwrap();
        assert_eq!(reconciled.similar_bands, vec!["sigur ros".to_string()]);
        assert_eq!(
            reconciled.similar_bands_missing,
            vec!["Unknown Band".to_string()]
        );
    }
}
