//! Walks the music root, reconciling on-disk folders into per-band metadata
//! and the collection index.

use crate::core::config::MUSIC_EXTENSIONS;
use crate::core::errors::LibraryError;
use crate::core::logging::{log_reconciliation_move, log_scan_operation};
use crate::domain::models::{Album, BandIndexEntry, BandMetadata, CollectionIndex};
use crate::domain::parser::FolderParser;
use crate::domain::structure::StructureDetector;
use crate::storage::{BandMetadataStore, CollectionIndexStore};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Traverses `<music_root>`, discovering bands and albums, reconciling each
/// band's metadata file, and rebuilding the collection index.
#[derive(Default)]
pub struct Scanner {
    parser: FolderParser,
    detector: StructureDetector,
    metadata_store: BandMetadataStore,
    index_store: CollectionIndexStore,
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            parser: FolderParser::new(),
            detector: StructureDetector::new(),
            metadata_store: BandMetadataStore::new(),
            index_store: CollectionIndexStore::new(),
        }
    }

    /// Scan the whole collection and return the rebuilt index.
    pub fn scan(&self, music_root: &Path) -> Result<CollectionIndex, LibraryError> {
        let mut index = CollectionIndex::empty();

        for entry in fs::read_dir(music_root)? {
            let entry = entry?;
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with('.') || !path.is_dir() {
                continue;
            }
            let band_entry = self.scan_band(&file_name, &path)?;
            index.upsert_band(band_entry);
        }

        self.index_store.update_collection_index(music_root, index)
    }

    /// Scan a single band folder: reconcile its metadata, save it, and
    /// return the resulting collection-index row.
    fn scan_band(&self, band_name: &str, band_dir: &Path) -> Result<BandIndexEntry, LibraryError> {
        let structure = self.detector.detect(band_dir)?;
        let discovered = self.discover_albums(band_dir, &structure.type_folders_found)?;
        log_scan_operation(band_dir, discovered.len());

        let existing = self.metadata_store.load_band_metadata(band_dir)?;
        let mut metadata = existing.unwrap_or_else(|| BandMetadata::new(band_name));
        metadata.band_name = band_name.to_string();
        metadata.folder_structure = Some(structure.clone());

        self.reconcile(&mut metadata, discovered);

        let summary = self
            .metadata_store
            .save_band_metadata(band_dir, metadata.clone())?;
        let _ = summary;

        Ok(BandIndexEntry {
            name: band_name.to_string(),
            folder_path: band_name.to_string(),
            albums_count: metadata.albums_count,
            local_albums_count: metadata.albums.len(),
            missing_albums_count: metadata.albums_missing.len(),
            has_metadata: true,
            has_analysis: metadata.analyze.is_some(),
            last_updated: metadata.last_updated,
            structure_type: metadata.folder_structure.as_ref().map(|f| f.structure_type),
            compliance_score: metadata.folder_structure.as_ref().map(|f| f.structure_score),
            album_type_distribution: Some(Self::type_distribution(&metadata.albums)),
        })
    }

    fn type_distribution(albums: &[Album]) -> std::collections::BTreeMap<String, usize> {
        let mut dist = std::collections::BTreeMap::new();
        for album in albums {
            *dist.entry(album.album_type.as_str().to_string()).or_insert(0) += 1;
        }
        dist
    }

    /// Walk `band_dir`'s immediate children (honoring type-folder nesting)
    /// and produce an `Album` record per discovered folder.
    fn discover_albums(
        &self,
        band_dir: &Path,
        known_type_folders: &[String],
    ) -> Result<Vec<Album>, LibraryError> {
        let _ = known_type_folders;
        let mut albums = Vec::new();

        for entry in fs::read_dir(band_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !path.is_dir() {
                continue;
            }

            if let Some(_type) = self.parser.detect_type_folder(&name) {
                for child in fs::read_dir(&path)? {
                    let child = child?;
                    let child_path = child.path();
                    let child_name = child.file_name().to_string_lossy().to_string();
                    if child_name.starts_with('.') || !child_path.is_dir() {
                        continue;
                    }
                    albums.push(self.build_album(&child_name, Some(&name), &child_path));
                }
            } else {
                albums.push(self.build_album(&name, None, &path));
            }
        }

        Ok(albums)
    }

    fn build_album(&self, name: &str, parent: Option<&str>, album_dir: &Path) -> Album {
        let parsed = self.parser.parse_with_parent(name, parent);
        let folder_path = match parent {
            Some(p) => format!("{}/{}", p, name),
            None => name.to_string(),
        };
        let track_count = count_music_files(album_dir);
        let mut album = Album::new(parsed.album_name);
        album.year = parsed.year;
        album.edition = parsed.edition;
        album.album_type = parsed.album_type.unwrap_or_default();
        album.folder_path = folder_path;
        album.track_count = track_count;
        album
    }

    /// Reconcile discovered on-disk albums with `metadata`'s existing
    /// `albums`/`albums_missing`, preserving user-authored fields and
    /// moving entries between the two arrays as disk presence changes.
    fn reconcile(&self, metadata: &mut BandMetadata, discovered: Vec<Album>) {
        let mut existing_local: HashMap<String, Album> = metadata
            .albums
            .drain(..)
            .map(|a| (a.album_name.to_lowercase(), a))
            .collect();
        let mut existing_missing: HashMap<String, Album> = metadata
            .albums_missing
            .drain(..)
            .map(|a| (a.album_name.to_lowercase(), a))
            .collect();

        let mut new_albums = Vec::with_capacity(discovered.len());

        for disk_album in discovered {
            let key = disk_album.album_name.to_lowercase();
            let mut merged = disk_album;
            if let Some(prev) = existing_local.remove(&key) {
                merge_preserved_fields(&mut merged, &prev);
            } else if let Some(prev) = existing_missing.remove(&key) {
                log_reconciliation_move(&metadata.band_name, &merged.album_name, false);
                merge_preserved_fields(&mut merged, &prev);
            }
            new_albums.push(merged);
        }

        let mut new_missing: Vec<Album> = existing_missing.into_values().collect();
        for (_, mut album) in existing_local {
            log_reconciliation_move(&metadata.band_name, &album.album_name, true);
            album.missing = false;
            new_missing.push(album);
        }

        metadata.albums = new_albums;
        metadata.albums_missing = new_missing;
        metadata.sync_albums_count();
    }
}

fn merge_preserved_fields(merged: &mut Album, prev: &Album) {
    if merged.genres.is_empty() {
        merged.genres = prev.genres.clone();
    }
    if merged.duration.is_empty() {
        merged.duration = prev.duration.clone();
    }
    if merged.edition.is_empty() {
        merged.edition = prev.edition.clone();
    }
}

fn count_music_files(dir: &Path) -> u32 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| MUSIC_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
                .unwrap_or(false)
        })
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::tempdir;

    fn touch(path: &Path) {
        File::create(path).unwrap();
    }

    #[test]
    fn scan_discovers_albums_and_writes_metadata() {
        let root = tempdir().unwrap();
        let band_dir = root.path().join("Radiohead");
        fs::create_dir_all(band_dir.join("1997 - OK Computer")).unwrap();
        touch(&band_dir.join("1997 - OK Computer").join("01 Airbag.mp3"));
        touch(&band_dir.join("1997 - OK Computer").join("02 Paranoid Android.mp3"));

        let scanner = Scanner::new();
        let index = scanner.scan(root.path()).unwrap();

        assert_eq!(index.bands.len(), 1);
        let entry = &index.bands[0];
        assert_eq!(entry.name, "Radiohead");
        assert_eq!(entry.local_albums_count, 1);

        let store = BandMetadataStore::new();
        let metadata = store.load_band_metadata(&band_dir).unwrap().unwrap();
        assert_eq!(metadata.albums.len(), 1);
        assert_eq!(metadata.albums[0].track_count, 2);
    }

    #[test]
    fn rescan_moves_removed_album_to_missing() {
        let root = tempdir().unwrap();
        let band_dir = root.path().join("Radiohead");
        let album_dir = band_dir.join("1997 - OK Computer");
        fs::create_dir_all(&album_dir).unwrap();

        let scanner = Scanner::new();
        scanner.scan(root.path()).unwrap();

        fs::remove_dir_all(&album_dir).unwrap();
        let index = scanner.scan(root.path()).unwrap();

        let entry = &index.bands[0];
        assert_eq!(entry.local_albums_count, 0);
        assert_eq!(entry.missing_albums_count, 1);
    }

    #[test]
    fn rescan_restores_album_from_missing() {
        let root = tempdir().unwrap();
        let band_dir = root.path().join("Radiohead");
        let album_dir = band_dir.join("1997 - OK Computer");
        fs::create_dir_all(&album_dir).unwrap();

        let scanner = Scanner::new();
        scanner.scan(root.path()).unwrap();
        fs::remove_dir_all(&album_dir).unwrap();
        scanner.scan(root.path()).unwrap();

        fs::create_dir_all(&album_dir).unwrap();
        let index = scanner.scan(root.path()).unwrap();

        let entry = &index.bands[0];
        assert_eq!(entry.local_albums_count, 1);
        assert_eq!(entry.missing_albums_count, 0);
    }

    #[test]
    fn scan_honors_enhanced_type_folders() {
        let root = tempdir().unwrap();
        let band_dir = root.path().join("Sigur Ros");
        fs::create_dir_all(band_dir.join("Live").join("2001 - Live Session")).unwrap();

        let scanner = Scanner::new();
        let index = scanner.scan(root.path()).unwrap();
        let entry = &index.bands[0];
        assert_eq!(entry.local_albums_count, 1);
    }
}
