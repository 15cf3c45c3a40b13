//! Paginated, filtered, sorted band/album listings over the collection
//! index and per-band metadata.

use crate::core::config::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::core::errors::LibraryError;
use crate::domain::models::{AlbumType, StructureType};
use crate::storage::{BandMetadataStore, CollectionIndexStore};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    AlbumsCount,
    LastUpdated,
    Completion,
    Compliance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl ComplianceLevel {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s >= 90 => ComplianceLevel::Excellent,
            s if s >= 70 => ComplianceLevel::Good,
            s if s >= 50 => ComplianceLevel::Fair,
            s if s >= 25 => ComplianceLevel::Poor,
            _ => ComplianceLevel::Critical,
        }
    }
}

/// All-optional, AND-combined filter criteria (spec §4.9).
#[derive(Debug, Clone, Default)]
pub struct QueryFilters {
    pub search: Option<String>,
    pub include_albums: bool,
    pub albums_scope: Option<AlbumsScope>,
    pub genre: Option<String>,
    pub has_metadata: Option<bool>,
    pub has_missing_albums: Option<bool>,
    pub has_album_of_type: Option<AlbumType>,
    pub compliance_level: Option<ComplianceLevel>,
    pub structure_type: Option<StructureType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlbumsScope {
    Local,
    Missing,
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub filters: QueryFilters,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub page: usize,
    pub page_size: usize,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            filters: QueryFilters::default(),
            sort_field: SortField::Name,
            sort_order: SortOrder::Ascending,
            page: 1,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlbumView {
    pub album_name: String,
    pub year: String,
    #[serde(rename = "type")]
    pub album_type: AlbumType,
    pub edition: String,
    pub track_count: u32,
    pub missing: bool,
    pub folder_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BandQueryResult {
    pub name: String,
    pub folder_path: String,
    pub albums_count: usize,
    pub local_albums_count: usize,
    pub missing_albums_count: usize,
    pub has_metadata: bool,
    pub has_analysis: bool,
    pub last_updated: String,
    pub structure_type: Option<StructureType>,
    pub compliance_score: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub albums: Option<Vec<AlbumView>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub bands: Vec<BandQueryResult>,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Reads the collection index plus on-demand per-band metadata to answer a
/// single filtered, sorted, paginated query.
#[derive(Default)]
pub struct QueryEngine {
    index_store: CollectionIndexStore,
    metadata_store: BandMetadataStore,
}

impl QueryEngine {
    pub fn new() -> Self {
        Self {
            index_store: CollectionIndexStore::new(),
            metadata_store: BandMetadataStore::new(),
        }
    }

    pub fn query(&self, music_root: &Path, request: QueryRequest) -> Result<QueryResponse, LibraryError> {
        let index = self.index_store.load_collection_index(music_root)?;
        let page_size = request.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
        let page = request.page.max(1);

        let needs_metadata = request.filters.genre.is_some() || request.filters.include_albums;

        let mut candidates = Vec::new();
        for entry in &index.bands {
            if let Some(expected) = request.filters.has_metadata {
                if entry.has_metadata != expected {
                    continue;
                }
            }
            if let Some(expected) = request.filters.has_missing_albums {
                if (entry.missing_albums_count > 0) != expected {
                    continue;
                }
            }
            if let Some(structure_type) = request.filters.structure_type {
                if entry.structure_type != Some(structure_type) {
                    continue;
                }
            }
            if let Some(level) = request.filters.compliance_level {
                let score = entry.compliance_score.unwrap_or(0);
                if ComplianceLevel::from_score(score) != level {
                    continue;
                }
            }
            if let Some(ref wanted_type) = request.filters.has_album_of_type {
                let has_type = entry
                    .album_type_distribution
                    .as_ref()
                    .map(|dist| dist.contains_key(wanted_type.as_str()))
                    .unwrap_or(false);
                if !has_type {
                    continue;
                }
            }

            let metadata = if needs_metadata {
                self.metadata_store.load_band_metadata(&music_root.join(&entry.folder_path))?
            } else {
                None
            };

            if let Some(ref genre_filter) = request.filters.genre {
                let genre_lower = genre_filter.to_lowercase();
                let matches = metadata
                    .as_ref()
                    .map(|m| m.genres.iter().any(|g| g.to_lowercase().contains(&genre_lower)))
                    .unwrap_or(false);
                if !matches {
                    continue;
                }
            }

            if let Some(ref search) = request.filters.search {
                let search_lower = search.to_lowercase();
                let name_match = entry.name.to_lowercase().contains(&search_lower);
                let album_match = request.filters.include_albums
                    && metadata.as_ref().map(|m| {
                        m.albums.iter().chain(m.albums_missing.iter()).any(|a| {
                            a.album_name.to_lowercase().contains(&search_lower)
                        })
                    }).unwrap_or(false);
                if !name_match && !album_match {
                    continue;
                }
            }

            candidates.push((entry.clone(), metadata));
        }

        candidates.sort_by(|(a, _), (b, _)| {
            let ordering = match request.sort_field {
                SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
                SortField::AlbumsCount => a.albums_count.cmp(&b.albums_count),
                SortField::LastUpdated => a.last_updated.cmp(&b.last_updated),
                SortField::Completion => completion(a)
                    .partial_cmp(&completion(b))
                    .unwrap_or(std::cmp::Ordering::Equal),
                SortField::Compliance => a.compliance_score.unwrap_or(0).cmp(&b.compliance_score.unwrap_or(0)),
            };
            if request.sort_order == SortOrder::Descending {
                ordering.reverse()
            } else {
                ordering
            }
        });

        let total_count = candidates.len();
        let page_count = total_count.div_ceil(page_size).max(1);
        let start = (page - 1) * page_size;
        let page_items: Vec<_> = candidates.into_iter().skip(start).take(page_size).collect();

        let bands = page_items
            .into_iter()
            .map(|(entry, metadata)| {
                let albums = if request.filters.include_albums {
                    metadata.as_ref().map(|m| build_album_views(m, request.filters.albums_scope))
                } else {
                    None
                };
                BandQueryResult {
                    name: entry.name,
                    folder_path: entry.folder_path,
                    albums_count: entry.albums_count,
                    local_albums_count: entry.local_albums_count,
                    missing_albums_count: entry.missing_albums_count,
                    has_metadata: entry.has_metadata,
                    has_analysis: entry.has_analysis,
                    last_updated: entry.last_updated,
                    structure_type: entry.structure_type,
                    compliance_score: entry.compliance_score,
                    albums,
                }
            })
            .collect();

        Ok(QueryResponse {
            bands,
            total_count,
            page,
            page_size,
            page_count,
            has_next: page < page_count,
            has_previous: page > 1,
        })
    }
}

fn completion(entry: &crate::domain::models::BandIndexEntry) -> f64 {
    if entry.albums_count == 0 {
        100.0
    } else {
        ((entry.albums_count - entry.missing_albums_count) as f64 / entry.albums_count as f64) * 100.0
    }
}

fn build_album_views(
    metadata: &crate::domain::models::BandMetadata,
    scope: Option<AlbumsScope>,
) -> Vec<AlbumView> {
    let mut views = Vec::new();
    if scope != Some(AlbumsScope::Missing) {
        for album in &metadata.albums {
            views.push(AlbumView {
                album_name: album.album_name.clone(),
                year: album.year.clone(),
                album_type: album.album_type,
                edition: album.edition.clone(),
                track_count: album.track_count,
                missing: false,
                folder_path: album.folder_path.clone(),
            });
        }
    }
    if scope != Some(AlbumsScope::Local) {
        for album in &metadata.albums_missing {
            views.push(AlbumView {
                album_name: album.album_name.clone(),
                year: album.year.clone(),
                album_type: album.album_type,
                edition: album.edition.clone(),
                track_count: album.track_count,
                missing: true,
                folder_path: album.folder_path.clone(),
            });
        }
    }
    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{now_iso8601, Album, BandIndexEntry, BandMetadata, CollectionIndex};
    use crate::storage::BandMetadataStore;
    use std::fs;
    use tempfile::tempdir;

    fn setup(root: &Path) {
        fs::create_dir_all(root.join("Radiohead")).unwrap();
        fs::create_dir_all(root.join("Sigur Ros")).unwrap();

        let store = BandMetadataStore::new();
        let mut radiohead = BandMetadata::new("Radiohead");
        radiohead.genres = vec!["Alternative Rock".to_string()];
        radiohead.albums.push(Album::new("OK Computer"));
        store.save_band_metadata(&root.join("Radiohead"), radiohead).unwrap();

        let mut sigur = BandMetadata::new("Sigur Ros");
        sigur.genres = vec!["Post-Rock".to_string()];
        sigur.albums_missing.push(Album::new("Takk..."));
        store.save_band_metadata(&root.join("Sigur Ros"), sigur).unwrap();

        let mut index = CollectionIndex::empty();
        index.bands.push(BandIndexEntry {
            name: "Radiohead".into(),
            folder_path: "Radiohead".into(),
            albums_count: 1,
            local_albums_count: 1,
            missing_albums_count: 0,
            has_metadata: true,
            has_analysis: false,
            last_updated: now_iso8601(),
            structure_type: Some(StructureType::Default),
            compliance_score: Some(95),
            album_type_distribution: None,
        });
        index.bands.push(BandIndexEntry {
            name: "Sigur Ros".into(),
            folder_path: "Sigur Ros".into(),
            albums_count: 1,
            local_albums_count: 0,
            missing_albums_count: 1,
            has_metadata: true,
            has_analysis: false,
            last_updated: now_iso8601(),
            structure_type: Some(StructureType::Legacy),
            compliance_score: Some(40),
            album_type_distribution: None,
        });
        let index_store = CollectionIndexStore::new();
        index_store.update_collection_index(root, index).unwrap();
    }

    #[test]
    fn filters_by_has_missing_albums() {
        let dir = tempdir().unwrap();
        setup(dir.path());
        let engine = QueryEngine::new();
        let mut request = QueryRequest::default();
        request.filters.has_missing_albums = Some(true);
        let response = engine.query(dir.path(), request).unwrap();
        assert_eq!(response.total_count, 1);
        assert_eq!(response.bands[0].name, "Sigur Ros");
    }

    #[test]
    fn sorts_by_compliance_descending() {
        let dir = tempdir().unwrap();
        setup(dir.path());
        let engine = QueryEngine::new();
        let mut request = QueryRequest::default();
        request.sort_field = SortField::Compliance;
        request.sort_order = SortOrder::Descending;
        let response = engine.query(dir.path(), request).unwrap();
        assert_eq!(response.bands[0].name, "Radiohead");
    }

    #[test]
    fn pagination_reports_correct_totals() {
        let dir = tempdir().unwrap();
        setup(dir.path());
        let engine = QueryEngine::new();
        let mut request = QueryRequest::default();
        request.page_size = 1;
        let response = engine.query(dir.path(), request).unwrap();
        assert_eq!(response.total_count, 2);
        assert_eq!(response.page_count, 2);
        assert!(response.has_next);
        assert!(!response.has_previous);
    }

    #[test]
    fn genre_filter_loads_metadata() {
        let dir = tempdir().unwrap();
        setup(dir.path());
        let engine = QueryEngine::new();
        let mut request = QueryRequest::default();
        request.filters.genre = Some("post-rock".to_string());
        let response = engine.query(dir.path(), request).unwrap();
        assert_eq!(response.total_count, 1);
        assert_eq!(response.bands[0].name, "Sigur Ros");
    }

    #[test]
    fn include_albums_returns_album_views() {
        let dir = tempdir().unwrap();
        setup(dir.path());
        let engine = QueryEngine::new();
        let mut request = QueryRequest::default();
        request.filters.include_albums = true;
        request.filters.search = Some("radiohead".to_string());
        let response = engine.query(dir.path(), request).unwrap();
        assert_eq!(response.bands.len(), 1);
        let albums = response.bands[0].albums.as_ref().unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].album_name, "OK Computer");
    }
}
