//! Pre-flight validation, transactional execution, and post-execution
//! integrity checking for band-folder structure migrations.

pub mod engine;
pub mod integrity;
pub mod validator;

pub use engine::{MigrationEngine, MigrationRequest};
pub use integrity::IntegrityChecker;
pub use validator::MigrationValidator;

use crate::domain::models::AlbumType;
use serde::Serialize;
use std::path::PathBuf;

/// The four structure transitions the engine knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MigrationType {
    DefaultToEnhanced,
    LegacyToDefault,
    MixedToEnhanced,
    EnhancedToDefault,
}

impl MigrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationType::DefaultToEnhanced => "DefaultToEnhanced",
            MigrationType::LegacyToDefault => "LegacyToDefault",
            MigrationType::MixedToEnhanced => "MixedToEnhanced",
            MigrationType::EnhancedToDefault => "EnhancedToDefault",
        }
    }

    pub fn targets_enhanced(&self) -> bool {
        matches!(self, MigrationType::DefaultToEnhanced | MigrationType::MixedToEnhanced)
    }
}

/// Overall migration state machine: `Pending -> InProgress -> {Completed | Failed | RolledBack}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MigrationStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    RolledBack,
}

/// Per-operation state machine: `Pending -> Executing -> Completed`, or back
/// to `Pending` via rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationStatus {
    Pending,
    Executing,
    Completed,
    RolledBack,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationKind {
    Move,
    Copy,
}

/// One planned (and, after execution, completed/failed) album relocation.
#[derive(Debug, Clone, Serialize)]
pub struct AlbumMigrationOperation {
    pub album_name: String,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
    pub album_type: AlbumType,
    pub operation_kind: OperationKind,
    pub status: OperationStatus,
}

/// One line of the in-memory migration log returned alongside the result.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationLogEntry {
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationLog {
    pub entries: Vec<MigrationLogEntry>,
}

impl MigrationLog {
    pub fn push(&mut self, message: impl Into<String>) {
        self.entries.push(MigrationLogEntry {
            message: message.into(),
        });
    }
}

/// Outcome of a single integrity check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityCheckResult {
    pub albums_verified: usize,
    pub files_missing: usize,
    pub permission_issues: usize,
    pub passed: bool,
    pub notes: Vec<String>,
}

/// The result of a single `migrate_band_structure` call.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationResult {
    pub band_name: String,
    pub migration_type: MigrationType,
    pub status: MigrationStatus,
    pub operations: Vec<AlbumMigrationOperation>,
    pub albums_migrated: usize,
    pub albums_failed: usize,
    pub dry_run: bool,
    pub backup_path: Option<String>,
    pub integrity: Option<IntegrityCheckResult>,
}
