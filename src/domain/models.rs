//! Core domain models for the band archivist: albums, bands, collection index.

use crate::core::config::{MAX_RATING, MIN_RATING};
use crate::core::errors::LibraryError;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Timestamp format used everywhere: ISO-8601 with second precision, local time.
/// Consumers must not rely on the time zone offset being present or stable (spec §6).
pub fn now_iso8601() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%z").to_string()
}

/// The category of a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlbumType {
    Album,
    EP,
    Live,
    Demo,
    Single,
    Compilation,
    Instrumental,
    Split,
}

impl Default for AlbumType {
    fn default() -> Self {
        AlbumType::Album
    }
}

impl AlbumType {
    pub const ALL: [AlbumType; 8] = [
        AlbumType::Album,
        AlbumType::EP,
        AlbumType::Live,
        AlbumType::Demo,
        AlbumType::Single,
        AlbumType::Compilation,
        AlbumType::Instrumental,
        AlbumType::Split,
    ];

    /// The exact string this variant serializes as, also used for folder/type-folder names.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlbumType::Album => "Album",
            AlbumType::EP => "EP",
            AlbumType::Live => "Live",
            AlbumType::Demo => "Demo",
            AlbumType::Single => "Single",
            AlbumType::Compilation => "Compilation",
            AlbumType::Instrumental => "Instrumental",
            AlbumType::Split => "Split",
        }
    }

    /// Parse a type-folder (or plural English form of one) name, case-insensitive.
    pub fn from_folder_name(name: &str) -> Option<AlbumType> {
        let lower = name.to_lowercase();
        for t in AlbumType::ALL {
            if lower == t.as_str().to_lowercase() {
                return Some(t);
            }
        }
        let plural = match lower.as_str() {
            "albums" => Some(AlbumType::Album),
            "eps" => Some(AlbumType::EP),
            "singles" => Some(AlbumType::Single),
            "lives" => Some(AlbumType::Live),
            "demos" => Some(AlbumType::Demo),
            "compilations" => Some(AlbumType::Compilation),
            "instrumentals" => Some(AlbumType::Instrumental),
            "splits" => Some(AlbumType::Split),
            _ => None,
        };
        plural
    }
}

/// One released work, either present on disk (`BandMetadata::albums`) or known
/// only from prior metadata (`BandMetadata::albums_missing`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub album_name: String,
    #[serde(default)]
    pub year: String,
    #[serde(rename = "type", default)]
    pub album_type: AlbumType,
    #[serde(default)]
    pub edition: String,
    #[serde(default)]
    pub track_count: u32,
    /// Written for backward compatibility only; the authoritative split is the
    /// two arrays on `BandMetadata`. Always false going forward (see §6).
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub folder_path: String,
}

impl Album {
    pub fn new(album_name: impl Into<String>) -> Self {
        Self {
            album_name: album_name.into(),
            year: String::new(),
            album_type: AlbumType::Album,
            edition: String::new(),
            track_count: 0,
            missing: false,
            duration: String::new(),
            genres: Vec::new(),
            folder_path: String::new(),
        }
    }

    /// Validate model invariants from spec §8 boundary behaviors.
    pub fn validate(&self) -> Result<(), LibraryError> {
        if self.album_name.trim().is_empty() {
            return Err(LibraryError::Validation(
                "album_name must not be empty".into(),
            ));
        }
        if !self.year.is_empty() {
            let year: u32 = self.year.parse().map_err(|_| {
                LibraryError::Validation(format!("year '{}' is not numeric", self.year))
            })?;
            if !(crate::core::config::MIN_YEAR..=crate::core::config::MAX_YEAR).contains(&year) {
                return Err(LibraryError::Validation(format!(
                    "year {} is out of range [{}, {}]",
                    year,
                    crate::core::config::MIN_YEAR,
                    crate::core::config::MAX_YEAR
                )));
            }
        }
        Ok(())
    }
}

/// Per-album user-authored review, reduced to its three owned fields on every
/// save (no derived data is ever persisted here, see spec §4.4 step 3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumAnalysis {
    pub album_name: String,
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub rate: u8,
}

impl AlbumAnalysis {
    pub fn validate(&self) -> Result<(), LibraryError> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rate) {
            return Err(LibraryError::Validation(format!(
                "rate {} is out of range [{}, {}]",
                self.rate, MIN_RATING, MAX_RATING
            )));
        }
        Ok(())
    }
}

/// User-authored band-level review data. Never overwritten implicitly by a
/// metadata refresh (preserve-merge, spec §4.4).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BandAnalysis {
    #[serde(default)]
    pub review: String,
    #[serde(default)]
    pub rate: u8,
    #[serde(default)]
    pub albums: Vec<AlbumAnalysis>,
    /// Similar band names confirmed present in the collection.
    #[serde(default)]
    pub similar_bands: Vec<String>,
    /// Similar band names not found in the collection.
    #[serde(default)]
    pub similar_bands_missing: Vec<String>,
}

impl BandAnalysis {
    pub fn validate(&self) -> Result<(), LibraryError> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rate) {
            return Err(LibraryError::Validation(format!(
                "rate {} is out of range [{}, {}]",
                self.rate, MIN_RATING, MAX_RATING
            )));
        }
        for album in &self.albums {
            album.validate()?;
        }
        Ok(())
    }
}

/// Overall classification of a band folder's naming convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureType {
    Default,
    Enhanced,
    Mixed,
    Legacy,
    Unknown,
}

impl Default for StructureType {
    fn default() -> Self {
        StructureType::Unknown
    }
}

/// How uniformly a band folder follows a single naming pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureConsistency {
    Consistent,
    MostlyConsistent,
    Inconsistent,
    Unknown,
}

impl Default for StructureConsistency {
    fn default() -> Self {
        StructureConsistency::Unknown
    }
}

/// A typed structure issue, constructed at the point its metric is computed
/// (never reconstructed later by matching against rendered text; see spec §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum StructureIssue {
    MissingYearPrefixes { count: usize },
    NonStandardEditionFormatting { count: usize },
    MixedDirectAndNestedAlbums,
    EmptyTypeFolder { folder: String },
    TooManyDistinctPatterns { pattern_count: usize },
    CriticalComplianceAlbum { album_name: String, score: i32 },
}

/// A typed structure recommendation, likewise constructed at its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum StructureRecommendation {
    AddYearPrefixes,
    NormalizeEditionFormatting,
    MigrateToEnhanced,
    MigrateToDefault,
    RemoveEmptyTypeFolders { folders: Vec<String> },
    ImproveCompliance { album_count: usize },
}

/// Counts of albums falling into each compliance bucket (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ComplianceDistribution {
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
    pub critical: usize,
}

impl ComplianceDistribution {
    pub fn record(&mut self, score: i32) {
        match score {
            s if s >= 90 => self.excellent += 1,
            s if s >= 70 => self.good += 1,
            s if s >= 50 => self.fair += 1,
            s if s >= 25 => self.poor += 1,
            _ => self.critical += 1,
        }
    }
}

/// Plain booleans summarizing folder health, so a host report generator can
/// render a summary without recomputing per-album scores (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthIndicators {
    pub has_year_prefixes: bool,
    pub consistent_patterns: bool,
    pub uses_type_folders: bool,
    pub good_compliance: bool,
    pub minimal_issues: bool,
}

/// Classifier output for one band folder.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolderStructure {
    #[serde(default)]
    pub structure_type: StructureType,
    #[serde(default)]
    pub consistency: StructureConsistency,
    #[serde(default)]
    pub consistency_score: i32,
    #[serde(default)]
    pub albums_analyzed: usize,
    #[serde(default)]
    pub albums_with_year: usize,
    #[serde(default)]
    pub albums_without_year: usize,
    #[serde(default)]
    pub albums_in_type_folders: usize,
    #[serde(default)]
    pub detected_patterns: Vec<String>,
    #[serde(default)]
    pub type_folders_found: Vec<String>,
    #[serde(default)]
    pub structure_score: i32,
    #[serde(default)]
    pub compliance_distribution: ComplianceDistribution,
    #[serde(default)]
    pub health_indicators: HealthIndicators,
    #[serde(default)]
    pub recommendations: Vec<StructureRecommendation>,
    #[serde(default)]
    pub issues: Vec<StructureIssue>,
}

impl FolderStructure {
    /// Migration is recommended when structure is Mixed, consistency is
    /// Inconsistent, or the overall score is below 70 (spec §4.2).
    pub fn migration_recommended(&self) -> bool {
        matches!(self.structure_type, StructureType::Mixed)
            || matches!(self.consistency, StructureConsistency::Inconsistent)
            || self.structure_score < 70
    }
}

/// Complete metadata for one band, stored at `.band_metadata.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandMetadata {
    pub band_name: String,
    #[serde(default)]
    pub formed: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub members: Vec<String>,
    pub albums_count: usize,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub albums: Vec<Album>,
    #[serde(default)]
    pub albums_missing: Vec<Album>,
    pub last_updated: String,
    #[serde(default)]
    pub last_metadata_saved: Option<String>,
    #[serde(default)]
    pub analyze: Option<BandAnalysis>,
    #[serde(default)]
    pub folder_structure: Option<FolderStructure>,
}

impl BandMetadata {
    pub fn new(band_name: impl Into<String>) -> Self {
        Self {
            band_name: band_name.into(),
            formed: String::new(),
            genres: Vec::new(),
            origin: String::new(),
            members: Vec::new(),
            albums_count: 0,
            description: String::new(),
            albums: Vec::new(),
            albums_missing: Vec::new(),
            last_updated: now_iso8601(),
            last_metadata_saved: None,
            analyze: None,
            folder_structure: None,
        }
    }

    /// Recompute the derived `albums_count` field (spec §3 invariant).
    pub fn sync_albums_count(&mut self) {
        self.albums_count = self.albums.len() + self.albums_missing.len();
    }

    /// Migrate the legacy single-array-with-`missing`-flag shape into the
    /// current two-array split (spec §6 backward compatibility).
    pub fn migrate_legacy_shape(&mut self) {
        if self.albums.iter().any(|a| a.missing) {
            let (missing, local): (Vec<Album>, Vec<Album>) =
                self.albums.drain(..).partition(|a| a.missing);
            self.albums = local;
            self.albums_missing.extend(missing.into_iter().map(|mut a| {
                a.missing = false;
                a
            }));
        }
        self.sync_albums_count();
    }

    /// Check the invariant that no album name is present in both arrays and
    /// that `albums_count` matches the sum of the two arrays (spec §8.1).
    pub fn validate_invariants(&self) -> Result<(), LibraryError> {
        if self.albums_count != self.albums.len() + self.albums_missing.len() {
            return Err(LibraryError::Validation(
                "albums_count does not match len(albums) + len(albums_missing)".into(),
            ));
        }
        let local: std::collections::HashSet<&str> =
            self.albums.iter().map(|a| a.album_name.as_str()).collect();
        for missing in &self.albums_missing {
            if local.contains(missing.album_name.as_str()) {
                return Err(LibraryError::Validation(format!(
                    "album '{}' appears in both albums and albums_missing",
                    missing.album_name
                )));
            }
        }
        Ok(())
    }
}

/// One row in the collection index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandIndexEntry {
    pub name: String,
    pub folder_path: String,
    pub albums_count: usize,
    pub local_albums_count: usize,
    pub missing_albums_count: usize,
    pub has_metadata: bool,
    pub has_analysis: bool,
    pub last_updated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure_type: Option<StructureType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliance_score: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_type_distribution: Option<BTreeMap<String, usize>>,
}

impl BandIndexEntry {
    pub fn validate_invariants(&self) -> Result<(), LibraryError> {
        if self.albums_count != self.local_albums_count + self.missing_albums_count {
            return Err(LibraryError::Validation(format!(
                "band '{}': albums_count does not match local + missing",
                self.name
            )));
        }
        Ok(())
    }
}

/// Aggregate statistics over the whole collection, always recomputed on
/// write, never accepted from a caller (spec §4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    pub total_bands: usize,
    pub total_albums: usize,
    pub total_local_albums: usize,
    pub total_missing_albums: usize,
    pub bands_with_metadata: usize,
    pub bands_with_analysis: usize,
    pub completion_percentage: f64,
    pub top_genres: Vec<(String, usize)>,
}

/// Optional higher-level notes a collaborator (out of scope here) may attach.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionInsight {
    pub generated_at: String,
    pub notes: Vec<String>,
}

/// The top-level catalog stored at `.collection_index.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionIndex {
    pub last_scan: String,
    pub metadata_version: String,
    pub bands: Vec<BandIndexEntry>,
    pub stats: CollectionStats,
    #[serde(default)]
    pub insights: Option<CollectionInsight>,
}

impl CollectionIndex {
    pub fn empty() -> Self {
        Self {
            last_scan: now_iso8601(),
            metadata_version: crate::core::config::METADATA_VERSION.to_string(),
            bands: Vec::new(),
            stats: CollectionStats::default(),
            insights: None,
        }
    }

    /// Recompute `stats` from `bands`; always called before a write (spec §4.5).
    pub fn recompute_stats(&mut self) {
        let total_bands = self.bands.len();
        let total_local_albums: usize = self.bands.iter().map(|b| b.local_albums_count).sum();
        let total_missing_albums: usize = self.bands.iter().map(|b| b.missing_albums_count).sum();
        let total_albums = total_local_albums + total_missing_albums;
        let bands_with_metadata = self.bands.iter().filter(|b| b.has_metadata).count();
        let bands_with_analysis = self.bands.iter().filter(|b| b.has_analysis).count();
        let completion_percentage = if total_albums == 0 {
            100.0
        } else {
            (total_local_albums as f64 / total_albums as f64) * 100.0
        };
        self.stats = CollectionStats {
            total_bands,
            total_albums,
            total_local_albums,
            total_missing_albums,
            bands_with_metadata,
            bands_with_analysis,
            completion_percentage,
            top_genres: self.stats.top_genres.clone(),
        };
    }

    pub fn find_band(&self, name: &str) -> Option<&BandIndexEntry> {
        self.bands
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name))
    }

    pub fn find_band_mut(&mut self, name: &str) -> Option<&mut BandIndexEntry> {
        self.bands
            .iter_mut()
            .find(|b| b.name.eq_ignore_ascii_case(name))
    }

    pub fn upsert_band(&mut self, entry: BandIndexEntry) {
        if let Some(existing) = self.bands.iter_mut().find(|b| b.name == entry.name) {
            *existing = entry;
        } else {
            self.bands.push(entry);
        }
    }
}

/// Severity of a single pre-flight migration finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// One pre-flight validation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: ValidationSeverity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
}

impl ValidationIssue {
    pub fn new(severity: ValidationSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            album_name: None,
        }
    }

    pub fn for_album(
        severity: ValidationSeverity,
        album_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            message: message.into(),
            album_name: Some(album_name.into()),
        }
    }
}
