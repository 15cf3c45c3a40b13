//! Plans, executes, and rolls back band-folder structure migrations, then
//! resyncs per-band metadata and the collection index.

use crate::core::errors::{LibraryError, MigrationErrorKind};
use crate::core::logging::{log_migration_result, log_migration_transition, log_rollback};
use crate::domain::models::{Album, AlbumType, StructureType};
use crate::domain::parser::FolderParser;
use crate::domain::structure::StructureDetector;
use crate::migration::integrity::IntegrityChecker;
use crate::migration::validator::MigrationValidator;
use crate::migration::{
    AlbumMigrationOperation, IntegrityCheckResult, MigrationLog, MigrationResult, MigrationStatus,
    MigrationType, OperationKind, OperationStatus,
};
use crate::storage::{BandMetadataStore, CollectionIndexStore};
use chrono::Local;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Parameters for one `migrate_band_structure` call.
#[derive(Debug, Clone)]
pub struct MigrationRequest {
    pub band_name: String,
    pub migration_type: MigrationType,
    pub dry_run: bool,
    pub type_overrides: HashMap<String, AlbumType>,
    pub backup_original: bool,
    pub force: bool,
    pub exclude_albums: HashSet<String>,
}

impl MigrationRequest {
    pub fn new(band_name: impl Into<String>, migration_type: MigrationType) -> Self {
        Self {
            band_name: band_name.into(),
            migration_type,
            dry_run: false,
            type_overrides: HashMap::new(),
            backup_original: true,
            force: false,
            exclude_albums: HashSet::new(),
        }
    }
}

/// Tracks per-album operation locks for the duration of one migration call.
struct OperationLocks {
    locked: Mutex<HashSet<String>>,
}

impl OperationLocks {
    fn new() -> Self {
        Self {
            locked: Mutex::new(HashSet::new()),
        }
    }

    fn acquire(&self, album_name: &str) -> bool {
        self.locked.lock().unwrap().insert(album_name.to_string())
    }

    fn release(&self, album_name: &str) {
        self.locked.lock().unwrap().remove(album_name);
    }
}

/// Executes band-folder structure migrations transactionally.
#[derive(Default)]
pub struct MigrationEngine {
    parser: FolderParser,
    detector: StructureDetector,
    validator: MigrationValidator,
    integrity: IntegrityChecker,
    metadata_store: BandMetadataStore,
    index_store: CollectionIndexStore,
}

impl MigrationEngine {
    pub fn new() -> Self {
        Self {
            parser: FolderParser::new(),
            detector: StructureDetector::new(),
            validator: MigrationValidator::new(),
            integrity: IntegrityChecker::new(),
            metadata_store: BandMetadataStore::new(),
            index_store: CollectionIndexStore::new(),
        }
    }

    pub fn migrate_band_structure(
        &self,
        music_root: &Path,
        request: MigrationRequest,
    ) -> Result<(MigrationResult, MigrationLog), LibraryError> {
        let mut log = MigrationLog::default();
        let band_dir = music_root.join(&request.band_name);
        log_migration_transition(&request.band_name, "Pending", "InProgress");
        log.push(format!("starting {} for '{}'", request.migration_type.as_str(), request.band_name));

        let structure = self.detector.detect(&band_dir)?;
        let operations = self.plan_operations(&band_dir, &request)?;

        let issues = self.validator.validate(
            &band_dir,
            structure.structure_type,
            request.migration_type,
            &operations,
            request.dry_run,
        );
        let blocking = issues.iter().any(|i| {
            matches!(i.severity, crate::domain::models::ValidationSeverity::Critical)
                || (!request.force && matches!(i.severity, crate::domain::models::ValidationSeverity::Error))
        });
        if blocking {
            log_migration_transition(&request.band_name, "InProgress", "Failed");
            let messages: Vec<String> = issues.iter().map(|i| i.message.clone()).collect();
            log.push(format!("validation failed: {}", messages.join("; ")));
            return Ok((
                MigrationResult {
                    band_name: request.band_name.clone(),
                    migration_type: request.migration_type,
                    status: MigrationStatus::Failed,
                    operations,
                    albums_migrated: 0,
                    albums_failed: 0,
                    dry_run: request.dry_run,
                    backup_path: None,
                    integrity: None,
                },
                log,
            ));
        }

        if request.dry_run {
            log.push("dry run: no filesystem changes made".to_string());
            return Ok((
                MigrationResult {
                    band_name: request.band_name.clone(),
                    migration_type: request.migration_type,
                    status: MigrationStatus::Completed,
                    operations,
                    albums_migrated: 0,
                    albums_failed: 0,
                    dry_run: true,
                    backup_path: None,
                    integrity: None,
                },
                log,
            ));
        }

        let backup_path = if request.backup_original {
            Some(self.backup_band_folder(&band_dir)?)
        } else {
            None
        };

        let (completed_ops, albums_migrated, albums_failed) =
            self.execute_all(&operations, &mut log)?;

        let target_structure = if request.migration_type.targets_enhanced() {
            StructureType::Enhanced
        } else {
            StructureType::Default
        };

        let metadata_path = self.metadata_store.metadata_path(&band_dir);
        let integrity: IntegrityCheckResult =
            self.integrity
                .check(&band_dir, &metadata_path, &completed_ops, target_structure);

        let mut status = if albums_failed > 0 || !integrity.passed {
            MigrationStatus::Failed
        } else {
            MigrationStatus::Completed
        };

        if status == MigrationStatus::Completed && albums_migrated >= 1 {
            if let Err(e) = self.sync_metadata_after_migration(
                music_root,
                &band_dir,
                &request.band_name,
                target_structure,
                &completed_ops,
            ) {
                log.push(format!("metadata resync failed: {}", e));
                status = MigrationStatus::Failed;
            }
        }

        log_migration_result(&request.band_name, &format!("{:?}", status), albums_migrated, albums_failed);
        log_migration_transition(&request.band_name, "InProgress", &format!("{:?}", status));

        Ok((
            MigrationResult {
                band_name: request.band_name,
                migration_type: request.migration_type,
                status,
                operations: completed_ops,
                albums_migrated,
                albums_failed,
                dry_run: false,
                backup_path,
                integrity: Some(integrity),
            },
            log,
        ))
    }

    fn plan_operations(
        &self,
        band_dir: &Path,
        request: &MigrationRequest,
    ) -> Result<Vec<AlbumMigrationOperation>, LibraryError> {
        let mut operations = Vec::new();
        for entry in fs::read_dir(band_dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !path.is_dir() {
                continue;
            }

            if let Some(_type_folder) = self.parser.detect_type_folder(&name) {
                for child in fs::read_dir(&path)? {
                    let child = child?;
                    let child_path = child.path();
                    let child_name = child.file_name().to_string_lossy().to_string();
                    if child_name.starts_with('.') || !child_path.is_dir() {
                        continue;
                    }
                    if let Some(op) = self.plan_one(band_dir, &child_path, &child_name, Some(&name), request) {
                        operations.push(op);
                    }
                }
            } else if let Some(op) = self.plan_one(band_dir, &path, &name, None, request) {
                operations.push(op);
            }
        }
        Ok(operations)
    }

    fn plan_one(
        &self,
        band_dir: &Path,
        source_path: &Path,
        folder_name: &str,
        parent: Option<&str>,
        request: &MigrationRequest,
    ) -> Option<AlbumMigrationOperation> {
        let parsed = self.parser.parse_with_parent(folder_name, parent);
        if request.exclude_albums.contains(&parsed.album_name) {
            return None;
        }

        let album_type = request
            .type_overrides
            .get(&parsed.album_name)
            .copied()
            .or(parsed.album_type)
            .unwrap_or(AlbumType::Album);

        let year = if parsed.year.is_empty() && request.migration_type == MigrationType::LegacyToDefault {
            Local::now().format("%Y").to_string()
        } else {
            parsed.year.clone()
        };

        let target_folder_name = build_target_folder_name(&year, &parsed.album_name, &parsed.edition);
        let target_path = if request.migration_type.targets_enhanced() {
            band_dir.join(album_type.as_str()).join(target_folder_name)
        } else {
            band_dir.join(target_folder_name)
        };

        Some(AlbumMigrationOperation {
            album_name: parsed.album_name,
            source_path: source_path.to_path_buf(),
            target_path,
            album_type,
            operation_kind: OperationKind::Move,
            status: OperationStatus::Pending,
        })
    }

    fn execute_all(
        &self,
        operations: &[AlbumMigrationOperation],
        log: &mut MigrationLog,
    ) -> Result<(Vec<AlbumMigrationOperation>, usize, usize), LibraryError> {
        let locks = OperationLocks::new();
        let mut completed: Vec<AlbumMigrationOperation> = Vec::with_capacity(operations.len());
        let mut migrated = 0usize;
        let mut failed = 0usize;
        let mut rollback_needed = false;

        for op in operations {
            let mut current = op.clone();
            if !locks.acquire(&current.album_name) {
                current.status = OperationStatus::Failed;
                failed += 1;
                completed.push(current);
                continue;
            }

            current.status = OperationStatus::Executing;
            log_migration_transition(&current.album_name, "Pending", "Executing");

            match self.execute_one(&mut current) {
                Ok(()) => {
                    current.status = OperationStatus::Completed;
                    migrated += 1;
                    locks.release(&current.album_name);
                }
                Err(e) => {
                    current.status = OperationStatus::Failed;
                    failed += 1;
                    locks.release(&current.album_name);
                    log.push(format!("operation failed for '{}': {}", current.album_name, e));
                    rollback_needed = true;
                }
            }
            completed.push(current);
        }

        if rollback_needed {
            for op in completed.iter_mut().filter(|o| o.status == OperationStatus::Completed) {
                let rolled_back = rollback_one(op);
                log_rollback(&op.album_name, &op.album_name, rolled_back);
                if rolled_back {
                    op.status = OperationStatus::RolledBack;
                    migrated = migrated.saturating_sub(1);
                }
            }
        }

        Ok((completed, migrated, failed))
    }

    fn execute_one(&self, op: &mut AlbumMigrationOperation) -> Result<(), LibraryError> {
        if op.source_path == op.target_path {
            return Ok(());
        }

        if let Some(parent) = op.target_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LibraryError::Migration(MigrationErrorKind::PermissionError, e.to_string())
            })?;
        }

        if op.target_path.exists() {
            op.target_path = resolve_conflict(&op.target_path)?;
        }

        fs::rename(&op.source_path, &op.target_path).or_else(|_| {
            copy_dir_recursive(&op.source_path, &op.target_path)
                .and_then(|_| fs::remove_dir_all(&op.source_path))
        })
        .map_err(|e| LibraryError::Migration(MigrationErrorKind::PermissionError, e.to_string()))?;

        Ok(())
    }

    fn backup_band_folder(&self, band_dir: &Path) -> Result<String, LibraryError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let band_name = band_dir.file_name().and_then(|n| n.to_str()).unwrap_or("band");
        let backup_dir = band_dir.with_file_name(format!("{}_backup_{}", band_name, stamp));
        copy_dir_recursive(band_dir, &backup_dir)?;
        Ok(backup_dir.to_string_lossy().to_string())
    }

    fn sync_metadata_after_migration(
        &self,
        music_root: &Path,
        band_dir: &Path,
        band_name: &str,
        target_structure: StructureType,
        completed_ops: &[AlbumMigrationOperation],
    ) -> Result<(), LibraryError> {
        let mut metadata = self
            .metadata_store
            .load_band_metadata(band_dir)?
            .ok_or_else(|| LibraryError::NotFound(format!("no metadata for band '{}'", band_name)))?;

        if let Some(structure) = metadata.folder_structure.as_mut() {
            structure.structure_type = target_structure;
        }

        let by_name: HashMap<String, &AlbumMigrationOperation> = completed_ops
            .iter()
            .filter(|op| op.status == OperationStatus::Completed)
            .map(|op| (op.album_name.to_lowercase(), op))
            .collect();

        for album in metadata.albums.iter_mut() {
            let key = album.album_name.to_lowercase();
            if let Some(op) = by_name.get(&key) {
                album.album_type = op.album_type;
                album.folder_path = relative_folder_path(band_dir, &op.target_path);
            } else {
                album.folder_path = recompute_folder_path(&self.parser, &album.folder_path, target_structure, album);
            }
        }

        self.metadata_store.save_band_metadata(band_dir, metadata)?;

        let mut index = self.index_store.load_collection_index(music_root)?;
        if let Some(entry) = index.find_band_mut(band_name) {
            entry.last_updated = crate::domain::models::now_iso8601();
            let metadata = self
                .metadata_store
                .load_band_metadata(band_dir)?
                .ok_or_else(|| LibraryError::NotFound(band_name.to_string()))?;
            entry.structure_type = metadata.folder_structure.as_ref().map(|f| f.structure_type);
            entry.album_type_distribution = Some(type_distribution(&metadata.albums));
        }
        self.index_store.update_collection_index(music_root, index)?;
        Ok(())
    }
}

fn type_distribution(albums: &[Album]) -> BTreeMap<String, usize> {
    let mut dist = BTreeMap::new();
    for album in albums {
        *dist.entry(album.album_type.as_str().to_string()).or_insert(0) += 1;
    }
    dist
}

fn relative_folder_path(band_dir: &Path, target_path: &Path) -> String {
    target_path
        .strip_prefix(band_dir)
        .unwrap_or(target_path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn recompute_folder_path(
    parser: &FolderParser,
    current_folder_path: &str,
    target_structure: StructureType,
    album: &Album,
) -> String {
    let base_name = current_folder_path.rsplit('/').next().unwrap_or(current_folder_path);
    let parsed = parser.parse_folder_name(base_name);
    let folder_name = build_target_folder_name(&parsed.year, &parsed.album_name, &parsed.edition);
    if matches!(target_structure, StructureType::Enhanced) {
        format!("{}/{}", album.album_type.as_str(), folder_name)
    } else {
        folder_name
    }
}

fn build_target_folder_name(year: &str, name: &str, edition: &str) -> String {
    let mut folder = if year.is_empty() {
        name.to_string()
    } else {
        format!("{} - {}", year, name)
    };
    if !edition.is_empty() {
        folder.push_str(&format!(" ({})", edition));
    }
    folder
}

/// Append `" (Conflict N)"` to the base name, preserving a trailing
/// parenthetical edition, incrementing N until the path is free.
fn resolve_conflict(target: &Path) -> Result<PathBuf, LibraryError> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let stem = target.file_name().and_then(|n| n.to_str()).unwrap_or("folder").to_string();

    let (base, trailing_paren) = match stem.rfind(" (") {
        Some(idx) if stem.ends_with(')') => (stem[..idx].to_string(), stem[idx..].to_string()),
        _ => (stem.clone(), String::new()),
    };

    for n in 1..=crate::core::config::MAX_CONFLICT_SUFFIX {
        let candidate_name = format!("{} (Conflict {}){}", base, n, trailing_paren);
        let candidate = parent.join(candidate_name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(LibraryError::Migration(
        MigrationErrorKind::PartialFailure,
        format!("could not resolve conflict for {}", target.display()),
    ))
}

fn rollback_one(op: &mut AlbumMigrationOperation) -> bool {
    if !op.target_path.exists() {
        return true;
    }
    match op.operation_kind {
        OperationKind::Move => fs::rename(&op.target_path, &op.source_path).is_ok(),
        OperationKind::Copy => fs::remove_dir_all(&op.target_path).is_ok(),
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn dry_run_plans_without_touching_disk() {
        let root = tempdir().unwrap();
        let band_dir = root.path().join("Radiohead");
        fs::create_dir_all(band_dir.join("1997 - OK Computer")).unwrap();
        File::create(band_dir.join("1997 - OK Computer").join("01.mp3")).unwrap();

        let engine = MigrationEngine::new();
        let mut request = MigrationRequest::new("Radiohead", MigrationType::DefaultToEnhanced);
        request.dry_run = true;
        let (result, _log) = engine.migrate_band_structure(root.path(), request).unwrap();

        assert!(result.dry_run);
        assert_eq!(result.albums_migrated, 0);
        assert!(band_dir.join("1997 - OK Computer").exists());
    }

    #[test]
    fn migrates_default_to_enhanced_and_moves_folder() {
        let root = tempdir().unwrap();
        let band_dir = root.path().join("Radiohead");
        fs::create_dir_all(band_dir.join("1997 - OK Computer")).unwrap();
        File::create(band_dir.join("1997 - OK Computer").join("01.mp3")).unwrap();

        let scanner = crate::scanner::Scanner::new();
        scanner.scan(root.path()).unwrap();

        let engine = MigrationEngine::new();
        let request = MigrationRequest::new("Radiohead", MigrationType::DefaultToEnhanced);
        let (result, _log) = engine.migrate_band_structure(root.path(), request).unwrap();

        assert_eq!(result.status, MigrationStatus::Completed);
        assert_eq!(result.albums_migrated, 1);
        assert!(band_dir.join("Album").join("1997 - OK Computer").exists());
        assert!(!band_dir.join("1997 - OK Computer").exists());
    }

    #[test]
    fn conflict_suffix_appended_preserving_edition() {
        let dir = tempdir().unwrap();
        let existing = dir.path().join("1997 - OK Computer (Deluxe Edition)");
        fs::create_dir_all(&existing).unwrap();
        let resolved = resolve_conflict(&existing).unwrap();
        assert_eq!(
            resolved.file_name().unwrap().to_str().unwrap(),
            "1997 - OK Computer (Conflict 1) (Deluxe Edition)"
        );
    }
}
