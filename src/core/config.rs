//! Application-wide configuration constants and settings.

use crate::core::errors::LibraryError;
use std::env;
use std::path::PathBuf;

/// Earliest year accepted by the folder-name parser and year validation.
pub const MIN_YEAR: u32 = 1950;

/// Latest year accepted by the folder-name parser and year validation.
pub const MAX_YEAR: u32 = 2030;

/// Minimum accepted band/album rating; 0 means "unrated".
pub const MIN_RATING: u8 = 0;

/// Maximum accepted band/album rating.
pub const MAX_RATING: u8 = 10;

/// Default bounded wait for acquiring a store file lock.
pub const LOCK_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Poll interval while waiting to acquire a store file lock.
pub const LOCK_POLL_INTERVAL: std::time::Duration = std::time::Duration::from_millis(50);

/// Number of timestamped backups retained per store file.
pub const BACKUP_RETENTION_COUNT: usize = 5;

/// Minimum allowed page size for `QueryEngine` pagination.
pub const MIN_PAGE_SIZE: usize = 1;

/// Maximum allowed page size for `QueryEngine` pagination.
pub const MAX_PAGE_SIZE: usize = 100;

/// Extra free space required beyond the estimated migration footprint.
pub const DISK_SPACE_MARGIN_BYTES: u64 = 10 * 1024 * 1024;

/// Fallback per-album size estimate used when a source folder's size can't be computed.
pub const FALLBACK_ALBUM_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Upper bound on the `" (Conflict N)"` suffix counter before a migration gives up.
pub const MAX_CONFLICT_SUFFIX: u32 = 999;

/// Current on-disk schema version stamped into `CollectionIndex::metadata_version`.
pub const METADATA_VERSION: &str = "1.0";

/// File extensions recognized as music tracks for track-count purposes (case-insensitive).
pub const MUSIC_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "wav", "aac", "m4a", "ogg", "wma", "mp4", "m4p",
];

/// Folder name fragments that disqualify an album name as "reasonable" for
/// migration prerequisites (temp/test/placeholder folders).
pub const UNREASONABLE_NAME_FRAGMENTS: &[&str] = &["temp", "test", "untitled", "new folder"];

/// Process-wide configuration, read once from the environment at startup.
///
/// The music root path is read once on initialization; rebinding at runtime
/// is not supported and is not required (see Design Notes, Global state).
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    pub music_root: PathBuf,
}

impl LibraryConfig {
    /// Construct configuration directly from a known music root.
    pub fn new(music_root: impl Into<PathBuf>) -> Self {
        Self {
            music_root: music_root.into(),
        }
    }

    /// Read `MUSIC_ROOT_PATH` from the environment (the only environment input, §6).
    pub fn from_env() -> Result<Self, LibraryError> {
        let raw = env::var("MUSIC_ROOT_PATH").map_err(|_| {
            LibraryError::Validation("MUSIC_ROOT_PATH environment variable is not set".into())
        })?;
        let path = PathBuf::from(raw);
        if !path.is_absolute() {
            return Err(LibraryError::Validation(format!(
                "MUSIC_ROOT_PATH must be an absolute path, got '{}'",
                path.display()
            )));
        }
        Ok(Self { music_root: path })
    }
}
