//! Pre-flight checks that decide whether a planned migration is safe to run.

use crate::core::config::{DISK_SPACE_MARGIN_BYTES, FALLBACK_ALBUM_SIZE_BYTES, UNREASONABLE_NAME_FRAGMENTS};
use crate::domain::models::{StructureType, ValidationIssue, ValidationSeverity};
use crate::migration::{AlbumMigrationOperation, MigrationType, OperationKind};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Stateless validator: runs the checks from spec §4.7 over a planned set of
/// operations and returns the accumulated issues.
#[derive(Debug, Default, Clone, Copy)]
pub struct MigrationValidator;

impl MigrationValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run every applicable check. `dry_run` skips disk-space and permission
    /// checks (cheaper preview); `force` only affects how the caller should
    /// interpret the returned issues (Criticals always block, Errors are
    /// downgradable under `force`).
    pub fn validate(
        &self,
        band_dir: &Path,
        current_structure: StructureType,
        migration_type: MigrationType,
        operations: &[AlbumMigrationOperation],
        dry_run: bool,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        self.check_source(band_dir, &mut issues);
        self.check_appropriateness(current_structure, migration_type, &mut issues);
        if migration_type.targets_enhanced() {
            self.check_type_folder_conflicts(band_dir, &mut issues);
        }
        self.check_destination_paths(band_dir, operations, &mut issues);
        self.check_conflicts(operations, &mut issues);
        self.check_prerequisites(migration_type, operations, &mut issues);

        if !dry_run {
            self.check_disk_space(operations, &mut issues);
            self.check_permissions(band_dir, operations, &mut issues);
        }

        issues
    }

    fn check_source(&self, band_dir: &Path, issues: &mut Vec<ValidationIssue>) {
        if !band_dir.is_dir() {
            issues.push(ValidationIssue::new(
                ValidationSeverity::Critical,
                format!("source band folder does not exist: {}", band_dir.display()),
            ));
            return;
        }
        if fs::read_dir(band_dir).is_err() {
            issues.push(ValidationIssue::new(
                ValidationSeverity::Critical,
                format!("source band folder is not readable: {}", band_dir.display()),
            ));
        }
    }

    fn check_appropriateness(
        &self,
        current: StructureType,
        migration_type: MigrationType,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let valid = matches!(
            (current, migration_type),
            (StructureType::Default, MigrationType::DefaultToEnhanced)
                | (StructureType::Legacy, MigrationType::LegacyToDefault)
                | (StructureType::Mixed, MigrationType::MixedToEnhanced)
                | (StructureType::Enhanced, MigrationType::EnhancedToDefault)
        );
        if !valid {
            issues.push(ValidationIssue::new(
                ValidationSeverity::Error,
                format!(
                    "{:?} structure is not an appropriate source for {}",
                    current,
                    migration_type.as_str()
                ),
            ));
        }
    }

    fn check_type_folder_conflicts(&self, band_dir: &Path, issues: &mut Vec<ValidationIssue>) {
        let Ok(entries) = fs::read_dir(band_dir) else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let has_children = fs::read_dir(&path)
                .map(|mut it| it.next().is_some())
                .unwrap_or(false);
            if has_children {
                issues.push(ValidationIssue::new(
                    ValidationSeverity::Warning,
                    format!(
                        "existing folder '{}' has content that may conflict with a new type folder",
                        entry.file_name().to_string_lossy()
                    ),
                ));
            }
        }
    }

    fn check_destination_paths(
        &self,
        band_dir: &Path,
        operations: &[AlbumMigrationOperation],
        issues: &mut Vec<ValidationIssue>,
    ) {
        let mut seen_targets = HashSet::new();
        for op in operations {
            if !seen_targets.insert(op.target_path.clone()) {
                issues.push(ValidationIssue::for_album(
                    ValidationSeverity::Error,
                    op.album_name.clone(),
                    format!("duplicate target path: {}", op.target_path.display()),
                ));
            }
            if op.target_path.exists() {
                issues.push(ValidationIssue::for_album(
                    ValidationSeverity::Warning,
                    op.album_name.clone(),
                    format!(
                        "target already exists and will be renamed with a conflict suffix: {}",
                        op.target_path.display()
                    ),
                ));
            }
            if let Some(parent) = op.target_path.parent() {
                if !self.ancestor_is_writable(band_dir, parent) {
                    issues.push(ValidationIssue::for_album(
                        ValidationSeverity::Error,
                        op.album_name.clone(),
                        format!("target parent directory is not creatable: {}", parent.display()),
                    ));
                }
            }
        }
    }

    fn ancestor_is_writable(&self, band_dir: &Path, target_parent: &Path) -> bool {
        let mut current = target_parent;
        loop {
            if current.exists() {
                return fs::metadata(current)
                    .map(|m| !m.permissions().readonly())
                    .unwrap_or(false);
            }
            match current.parent() {
                Some(parent) if parent.starts_with(band_dir) || parent == band_dir => {
                    current = parent;
                }
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn check_disk_space(&self, operations: &[AlbumMigrationOperation], issues: &mut Vec<ValidationIssue>) {
        let mut required: u64 = 0;
        for op in operations {
            if op.operation_kind == OperationKind::Copy {
                required += dir_size(&op.source_path).unwrap_or(FALLBACK_ALBUM_SIZE_BYTES);
            }
        }
        if required == 0 {
            return;
        }
        let needed = required + DISK_SPACE_MARGIN_BYTES;
        let available = available_space(&operations[0].target_path);
        if available < needed {
            issues.push(ValidationIssue::new(
                ValidationSeverity::Critical,
                format!(
                    "insufficient disk space: need {} bytes, have {} bytes available",
                    needed, available
                ),
            ));
        }
    }

    fn check_permissions(&self, band_dir: &Path, operations: &[AlbumMigrationOperation], issues: &mut Vec<ValidationIssue>) {
        for op in operations {
            if fs::metadata(&op.source_path).is_err() {
                issues.push(ValidationIssue::for_album(
                    ValidationSeverity::Error,
                    op.album_name.clone(),
                    format!("source is not readable: {}", op.source_path.display()),
                ));
            }
            if op.operation_kind == OperationKind::Move {
                if let Some(source_parent) = op.source_path.parent() {
                    if fs::metadata(source_parent)
                        .map(|m| m.permissions().readonly())
                        .unwrap_or(true)
                    {
                        issues.push(ValidationIssue::for_album(
                            ValidationSeverity::Error,
                            op.album_name.clone(),
                            "source parent directory is not writable".to_string(),
                        ));
                    }
                }
            }
            let _ = band_dir;
        }
    }

    fn check_conflicts(&self, operations: &[AlbumMigrationOperation], issues: &mut Vec<ValidationIssue>) {
        let mut seen_sources = HashSet::new();
        for op in operations {
            if !seen_sources.insert(op.source_path.clone()) {
                issues.push(ValidationIssue::for_album(
                    ValidationSeverity::Error,
                    op.album_name.clone(),
                    format!("duplicate source path: {}", op.source_path.display()),
                ));
            }
        }
    }

    fn check_prerequisites(
        &self,
        migration_type: MigrationType,
        operations: &[AlbumMigrationOperation],
        issues: &mut Vec<ValidationIssue>,
    ) {
        if operations.is_empty() {
            issues.push(ValidationIssue::new(
                ValidationSeverity::Error,
                "no albums found to migrate",
            ));
            return;
        }

        let has_reasonable_name = operations.iter().any(|op| is_reasonable_album_name(&op.album_name));
        if !has_reasonable_name {
            issues.push(ValidationIssue::new(
                ValidationSeverity::Warning,
                "no album has a clearly identifiable name",
            ));
        }

        if migration_type == MigrationType::LegacyToDefault {
            let has_missing_year = operations
                .iter()
                .any(|op| !op.source_path.to_string_lossy().chars().take(4).all(|c| c.is_ascii_digit()));
            if !has_missing_year {
                issues.push(ValidationIssue::new(
                    ValidationSeverity::Info,
                    "all albums already appear to have a year prefix",
                ));
            }
        }
    }
}

fn is_reasonable_album_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    !UNREASONABLE_NAME_FRAGMENTS.iter().any(|frag| lower.contains(frag)) && name.trim().len() >= 2
}

fn dir_size(path: &Path) -> Option<u64> {
    let mut total = 0u64;
    let entries = fs::read_dir(path).ok()?;
    for entry in entries.filter_map(|e| e.ok()) {
        let metadata = entry.metadata().ok()?;
        if metadata.is_dir() {
            total += dir_size(&entry.path()).unwrap_or(0);
        } else {
            total += metadata.len();
        }
    }
    Some(total)
}

fn available_space(path: &Path) -> u64 {
    let mut probe = path.to_path_buf();
    while !probe.exists() {
        match probe.parent() {
            Some(p) => probe = p.to_path_buf(),
            None => return u64::MAX,
        }
    }
    fs4::available_space(&probe).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AlbumType;
    use crate::migration::OperationStatus;
    use tempfile::tempdir;

    fn op(album_name: &str, source: &Path, target: &Path) -> AlbumMigrationOperation {
        AlbumMigrationOperation {
            album_name: album_name.to_string(),
            source_path: source.to_path_buf(),
            target_path: target.to_path_buf(),
            album_type: AlbumType::Album,
            operation_kind: OperationKind::Move,
            status: OperationStatus::Pending,
        }
    }

    #[test]
    fn flags_missing_source() {
        let validator = MigrationValidator::new();
        let issues = validator.validate(
            Path::new("/nonexistent/band"),
            StructureType::Default,
            MigrationType::DefaultToEnhanced,
            &[],
            true,
        );
        assert!(issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Critical));
    }

    #[test]
    fn flags_inappropriate_migration_pair() {
        let dir = tempdir().unwrap();
        let validator = MigrationValidator::new();
        let issues = validator.validate(
            dir.path(),
            StructureType::Enhanced,
            MigrationType::DefaultToEnhanced,
            &[],
            true,
        );
        assert!(issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Error));
    }

    #[test]
    fn flags_duplicate_targets() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("A")).unwrap();
        fs::create_dir_all(dir.path().join("B")).unwrap();
        let target = dir.path().join("Target");
        let operations = vec![
            op("A", &dir.path().join("A"), &target),
            op("B", &dir.path().join("B"), &target),
        ];
        let validator = MigrationValidator::new();
        let issues = validator.validate(
            dir.path(),
            StructureType::Default,
            MigrationType::DefaultToEnhanced,
            &operations,
            true,
        );
        assert!(issues
            .iter()
            .any(|i| i.severity == ValidationSeverity::Error && i.message.contains("duplicate target")));
    }

    #[test]
    fn empty_operations_is_an_error() {
        let dir = tempdir().unwrap();
        let validator = MigrationValidator::new();
        let issues = validator.validate(
            dir.path(),
            StructureType::Default,
            MigrationType::DefaultToEnhanced,
            &[],
            true,
        );
        assert!(issues
            .iter()
            .any(|i| i.message.contains("no albums found")));
    }
}
