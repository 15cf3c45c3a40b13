//! Locked, atomic, backed-up JSON read/write primitives shared by every store.

use crate::core::config::{BACKUP_RETENTION_COUNT, LOCK_POLL_INTERVAL, LOCK_TIMEOUT};
use crate::core::errors::LibraryError;
use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn lock_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    target.with_file_name(name)
}

fn temp_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

fn backup_path_for(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".backup");
    target.with_file_name(name)
}

/// Holds the exclusive lock on a target file's `.lock` sibling for the
/// lifetime of the guard. Releases and unlinks the lockfile on drop,
/// including on panics, per the atomic-store concurrency contract.
struct LockGuard {
    // Declared before `_rwlock` so it drops first: the write guard's borrow
    // must end before the box it points into is freed.
    _guard: fd_lock::RwLockWriteGuard<'static, File>,
    _rwlock: Box<fd_lock::RwLock<File>>,
    path: PathBuf,
}

impl LockGuard {
    fn acquire(target: &Path) -> Result<Self, LibraryError> {
        let lock_path = lock_path_for(target);
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        let mut rwlock = Box::new(fd_lock::RwLock::new(file));
        let start = Instant::now();
        loop {
            // SAFETY: `rwlock` is heap-allocated and stored alongside the
            // guard it produces, so the data it points to outlives any
            // borrow taken here for as long as this `LockGuard` exists.
            let rwlock_ref: &'static mut fd_lock::RwLock<File> =
                unsafe { &mut *(rwlock.as_mut() as *mut fd_lock::RwLock<File>) };
            match rwlock_ref.try_write() {
                Ok(guard) => {
                    return Ok(Self {
                        _guard: guard,
                        _rwlock: rwlock,
                        path: lock_path,
                    });
                }
                Err(_) => {
                    if start.elapsed() >= LOCK_TIMEOUT {
                        let _ = fs::remove_file(&lock_path);
                        return Err(LibraryError::LockTimeout(format!(
                            "could not acquire lock for {} within {:?}",
                            target.display(),
                            LOCK_TIMEOUT
                        )));
                    }
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
            }
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Owns a `.tmp` sibling file and deletes it on drop unless `persist` is
/// called, so a panic or early return between write and rename never leaves
/// a stray temp file behind.
struct TempFileGuard {
    path: PathBuf,
    persisted: bool,
}

impl TempFileGuard {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            persisted: false,
        }
    }

    fn persist(mut self) {
        self.persisted = true;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.persisted {
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Locked, atomic, backed-up JSON storage over a single target file.
#[derive(Debug, Default, Clone, Copy)]
pub struct AtomicStore;

impl AtomicStore {
    pub fn new() -> Self {
        Self
    }

    /// Load and parse `target` as JSON. Fails with `NotFound` if the file is
    /// absent, `DataCorrupt` on a JSON parse error.
    pub fn load<T: DeserializeOwned>(&self, target: &Path) -> Result<T, LibraryError> {
        if !target.exists() {
            return Err(LibraryError::NotFound(format!(
                "file not found: {}",
                target.display()
            )));
        }
        let contents = fs::read_to_string(target)?;
        serde_json::from_str(&contents)
            .map_err(|e| LibraryError::DataCorrupt(format!("{}: {}", target.display(), e)))
    }

    /// Serialize `value` with stable key ordering and pretty-printed
    /// indentation, then write it to `target` atomically, under the file's
    /// exclusive lock, optionally preceded by a timestamped backup.
    pub fn save<T: Serialize>(
        &self,
        target: &Path,
        value: &T,
        backup: bool,
    ) -> Result<(), LibraryError> {
        let _lock = LockGuard::acquire(target)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        if backup && target.exists() {
            fs::copy(target, backup_path_for(target))?;
        }

        let temp_path = temp_path_for(target);
        let guard = TempFileGuard::new(temp_path.clone());
        let serialized = serde_json::to_string_pretty(value)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(serialized.as_bytes())?;
            file.flush()?;
        }
        fs::rename(&temp_path, target)?;
        guard.persist();
        Ok(())
    }

    /// Copy `target` to `target.backup_YYYYMMDD_HHMMSS.<ext>` and prune older
    /// backups beyond `BACKUP_RETENTION_COUNT`.
    pub fn create_timestamped_backup(&self, target: &Path) -> Result<PathBuf, LibraryError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let ext = target.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let stem = target.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
        let backup_name = format!("{}.backup_{}.{}", stem, stamp, ext);
        let backup_path = target.with_file_name(backup_name);
        fs::copy(target, &backup_path)?;
        self.prune_old_backups(target, stem, ext)?;
        Ok(backup_path)
    }

    fn prune_old_backups(&self, target: &Path, stem: &str, ext: &str) -> Result<(), LibraryError> {
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        let prefix = format!("{}.backup_", stem);
        let suffix = format!(".{}", ext);
        let mut backups: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(&prefix) && n.ends_with(&suffix))
                    .unwrap_or(false)
            })
            .collect();
        backups.sort();
        if backups.len() > BACKUP_RETENTION_COUNT {
            for old in &backups[..backups.len() - BACKUP_RETENTION_COUNT] {
                let _ = fs::remove_file(old);
            }
        }
        Ok(())
    }

    pub fn file_exists(&self, target: &Path) -> bool {
        target.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        value: u32,
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("sample.json");
        let store = AtomicStore::new();
        store.save(&target, &Sample { value: 42 }, false).unwrap();
        let loaded: Sample = store.load(&target).unwrap();
        assert_eq!(loaded.value, 42);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("missing.json");
        let store = AtomicStore::new();
        let result: Result<Sample, LibraryError> = store.load(&target);
        assert!(matches!(result, Err(LibraryError::NotFound(_))));
    }

    #[test]
    fn load_corrupt_json_is_data_corrupt() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("corrupt.json");
        fs::write(&target, "{not valid json").unwrap();
        let store = AtomicStore::new();
        let result: Result<Sample, LibraryError> = store.load(&target);
        assert!(matches!(result, Err(LibraryError::DataCorrupt(_))));
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("sample.json");
        let store = AtomicStore::new();
        store.save(&target, &Sample { value: 1 }, false).unwrap();
        assert!(!temp_path_for(&target).exists());
        assert!(!lock_path_for(&target).exists());
    }

    #[test]
    fn lock_guard_holds_exclusive_lock_until_dropped() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("sample.json");
        let lock_path = lock_path_for(&target);

        let guard = LockGuard::acquire(&target).unwrap();

        let probe_file = OpenOptions::new().write(true).open(&lock_path).unwrap();
        let mut probe = fd_lock::RwLock::new(probe_file);
        assert!(probe.try_write().is_err(), "lock should still be held while guard is alive");

        drop(guard);

        let probe_file = OpenOptions::new().write(true).open(&lock_path).unwrap();
        let mut probe = fd_lock::RwLock::new(probe_file);
        assert!(probe.try_write().is_ok(), "lock should be released once guard is dropped");
    }

    #[test]
    fn save_creates_backup_when_requested() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("sample.json");
        let store = AtomicStore::new();
        store.save(&target, &Sample { value: 1 }, false).unwrap();
        store.save(&target, &Sample { value: 2 }, true).unwrap();
        assert!(backup_path_for(&target).exists());
    }

    #[test]
    fn backup_retention_prunes_oldest() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("sample.json");
        let store = AtomicStore::new();
        store.save(&target, &Sample { value: 0 }, false).unwrap();
        for i in 0..(BACKUP_RETENTION_COUNT + 3) {
            store.create_timestamped_backup(&target).unwrap();
            store.save(&target, &Sample { value: i as u32 }, false).unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        let dir_entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".backup_"))
            .collect();
        assert!(dir_entries.len() <= BACKUP_RETENTION_COUNT);
    }
}
