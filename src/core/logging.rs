//! Logging utilities for the band archivist core.

use log::{LevelFilter, Record};

/// Initialize application logging with the specified level.
pub fn init_logging(level: LevelFilter) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
        .init();
}

/// Initialize application logging with a custom format.
pub fn init_logging_with_format<F>(level: LevelFilter, format_fn: F)
where
    F: Fn(&mut env_logger::fmt::Formatter, &Record) -> std::io::Result<()> + Send + Sync + 'static,
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
        .format(format_fn)
        .init();
}

/// Log a library scan of a single band folder.
pub fn log_scan_operation(band_folder: &std::path::Path, albums_found: usize) {
    log::info!(
        target: "music_library",
        "Scanned {} album folder(s) under {}",
        albums_found,
        band_folder.display()
    );
}

/// Log an album moving between `albums` and `albums_missing` during reconciliation.
pub fn log_reconciliation_move(band_name: &str, album_name: &str, now_missing: bool) {
    if now_missing {
        log::debug!(target: "music_library", "{}: '{}' no longer on disk, moved to albums_missing", band_name, album_name);
    } else {
        log::debug!(target: "music_library", "{}: '{}' found on disk, moved to albums", band_name, album_name);
    }
}

/// Log a per-band metadata save.
pub fn log_metadata_save(band_name: &str, success: bool) {
    if success {
        log::info!(target: "music_library", "Saved metadata for band '{}'", band_name);
    } else {
        log::error!(target: "music_library", "Failed to save metadata for band '{}'", band_name);
    }
}

/// Log the collection index being rebuilt.
pub fn log_index_update(band_count: usize) {
    log::info!(target: "music_library", "Updated collection index with {} band(s)", band_count);
}

/// Log a migration state transition.
pub fn log_migration_transition(band_name: &str, from: &str, to: &str) {
    log::debug!(target: "music_library", "Migration for '{}': {} -> {}", band_name, from, to);
}

/// Log a completed, failed, or rolled-back migration.
pub fn log_migration_result(band_name: &str, status: &str, albums_migrated: usize, albums_failed: usize) {
    if albums_failed > 0 {
        log::warn!(
            target: "music_library",
            "Migration for '{}' finished as {}: {} migrated, {} failed",
            band_name, status, albums_migrated, albums_failed
        );
    } else {
        log::info!(
            target: "music_library",
            "Migration for '{}' finished as {}: {} migrated",
            band_name, status, albums_migrated
        );
    }
}

/// Log a rollback of a single migration operation.
pub fn log_rollback(band_name: &str, album_name: &str, success: bool) {
    if success {
        log::warn!(target: "music_library", "Rolled back '{}/{}'", band_name, album_name);
    } else {
        log::error!(target: "music_library", "Rollback FAILED for '{}/{}'", band_name, album_name);
    }
}

/// Log an error with context.
pub fn log_error_with_context(context: &str, error: &dyn std::error::Error) {
    log::error!(target: "music_library", "Error in {}: {}", context, error);
}

/// Log the only implicit recovery the core performs: an existing metadata
/// file that failed to load (corrupt JSON, missing fields) is treated as
/// absent rather than aborting the save that triggered the load.
pub fn log_metadata_load_recovered(band_dir: &std::path::Path, error: &dyn std::error::Error) {
    log::warn!(
        target: "music_library",
        "Existing metadata under {} failed to load, treating as no existing data: {}",
        band_dir.display(),
        error
    );
}
