//! Post-execution integrity check: did the migration actually do what it
//! claims without losing data.

use crate::core::config::MUSIC_EXTENSIONS;
use crate::domain::models::StructureType;
use crate::migration::{AlbumMigrationOperation, IntegrityCheckResult, OperationKind, OperationStatus};
use std::fs;
use std::path::Path;

/// Verifies completed operations, the band folder, and the metadata file
/// after a migration, per spec §4.8.1.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntegrityChecker;

impl IntegrityChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(
        &self,
        band_dir: &Path,
        metadata_path: &Path,
        operations: &[AlbumMigrationOperation],
        target_structure: StructureType,
    ) -> IntegrityCheckResult {
        let mut result = IntegrityCheckResult::default();
        let mut data_loss = false;

        for op in operations {
            if op.status != OperationStatus::Completed {
                continue;
            }

            if !op.target_path.exists() {
                result.files_missing += 1;
                result.notes.push(format!(
                    "target missing for '{}': {}",
                    op.album_name,
                    op.target_path.display()
                ));
                data_loss = true;
                continue;
            }

            if fs::read_dir(&op.target_path).is_err() {
                result.permission_issues += 1;
                result
                    .notes
                    .push(format!("target not readable for '{}'", op.album_name));
                continue;
            }

            if op.operation_kind == OperationKind::Move && op.source_path.exists() {
                result.notes.push(format!(
                    "source still present after move for '{}': {}",
                    op.album_name,
                    op.source_path.display()
                ));
            }

            let file_count = count_entries(&op.target_path);
            if file_count == 0 {
                result.files_missing += 1;
                result
                    .notes
                    .push(format!("target is empty for '{}'", op.album_name));
                data_loss = true;
                continue;
            }

            if count_music_files(&op.target_path) == 0 {
                result
                    .notes
                    .push(format!("no recognized music files under '{}'", op.album_name));
            }

            result.albums_verified += 1;
        }

        if !band_dir.is_dir() {
            result.notes.push("band folder no longer exists".to_string());
            data_loss = true;
        } else if matches!(target_structure, StructureType::Enhanced) {
            if let Ok(entries) = fs::read_dir(band_dir) {
                for entry in entries.filter_map(|e| e.ok()) {
                    if entry.path().is_dir() && looks_like_album_folder(&entry.file_name().to_string_lossy()) {
                        result
                            .notes
                            .push(format!("album folder found at band root in Enhanced target: {}", entry.file_name().to_string_lossy()));
                    }
                }
            }
        }

        if metadata_path.exists() {
            match fs::read_to_string(metadata_path) {
                Ok(contents) => {
                    if serde_json::from_str::<serde_json::Value>(&contents)
                        .map(|v| !v.is_object())
                        .unwrap_or(true)
                    {
                        result.notes.push("metadata file is not a valid JSON object".to_string());
                        data_loss = true;
                    }
                }
                Err(_) => {
                    result.permission_issues += 1;
                }
            }
        }

        result.passed = !data_loss;
        result
    }
}

fn looks_like_album_folder(name: &str) -> bool {
    name.chars().take(4).all(|c| c.is_ascii_digit())
}

fn count_entries(dir: &Path) -> usize {
    fs::read_dir(dir).map(|it| it.filter_map(|e| e.ok()).count()).unwrap_or(0)
}

fn count_music_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|it| {
            it.filter_map(|e| e.ok())
                .filter(|e| {
                    e.path()
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .map(|ext| MUSIC_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
                        .unwrap_or(false)
                })
                .count()
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AlbumType;
    use std::fs::File;
    use tempfile::tempdir;

    fn completed_op(source: &Path, target: &Path) -> AlbumMigrationOperation {
        AlbumMigrationOperation {
            album_name: "Album".to_string(),
            source_path: source.to_path_buf(),
            target_path: target.to_path_buf(),
            album_type: AlbumType::Album,
            operation_kind: OperationKind::Move,
            status: OperationStatus::Completed,
        }
    }

    #[test]
    fn passes_when_target_has_music_files() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Album").join("1997 - OK Computer");
        fs::create_dir_all(&target).unwrap();
        File::create(target.join("01 Airbag.mp3")).unwrap();
        let source = dir.path().join("gone");

        let checker = IntegrityChecker::new();
        let result = checker.check(
            dir.path(),
            &dir.path().join(".band_metadata.json"),
            &[completed_op(&source, &target)],
            StructureType::Enhanced,
        );
        assert!(result.passed);
        assert_eq!(result.albums_verified, 1);
    }

    #[test]
    fn fails_when_target_missing() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nonexistent-target");
        let source = dir.path().join("gone");

        let checker = IntegrityChecker::new();
        let result = checker.check(
            dir.path(),
            &dir.path().join(".band_metadata.json"),
            &[completed_op(&source, &target)],
            StructureType::Enhanced,
        );
        assert!(!result.passed);
        assert_eq!(result.files_missing, 1);
    }

    #[test]
    fn fails_when_target_empty() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Album").join("Empty");
        fs::create_dir_all(&target).unwrap();
        let source = dir.path().join("gone");

        let checker = IntegrityChecker::new();
        let result = checker.check(
            dir.path(),
            &dir.path().join(".band_metadata.json"),
            &[completed_op(&source, &target)],
            StructureType::Enhanced,
        );
        assert!(!result.passed);
    }
}
