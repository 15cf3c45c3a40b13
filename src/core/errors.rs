//! Centralized error types for the band archivist core.

use serde::Serialize;
use std::fmt;

/// Subkinds of [`LibraryError::Migration`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MigrationErrorKind {
    /// A source or target path could not be read or written due to permissions.
    PermissionError,
    /// Not enough free space on the target filesystem.
    DiskSpaceError,
    /// A per-file or per-album lock could not be acquired.
    FileLockError,
    /// Some album operations completed and some failed; the migration is partially applied.
    PartialFailure,
    /// Rolling back a failed operation itself failed; filesystem state may be inconsistent.
    RollbackError,
}

impl fmt::Display for MigrationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationErrorKind::PermissionError => write!(f, "permission error"),
            MigrationErrorKind::DiskSpaceError => write!(f, "insufficient disk space"),
            MigrationErrorKind::FileLockError => write!(f, "could not acquire file lock"),
            MigrationErrorKind::PartialFailure => write!(f, "partial failure"),
            MigrationErrorKind::RollbackError => write!(f, "rollback failed"),
        }
    }
}

/// Main error enum for the band archivist core.
///
/// Every public operation returns `Result<T, LibraryError>`; see
/// `core::errors` module docs for the propagation policy.
#[derive(Debug, Clone, Serialize)]
pub enum LibraryError {
    /// Input fails a model invariant (bad year, negative count, unknown enum value).
    /// User-recoverable; never logged as an error.
    Validation(String),
    /// Requested file or band is absent. Non-fatal at most call sites.
    NotFound(String),
    /// A store file's JSON failed to parse. Never silently repaired.
    DataCorrupt(String),
    /// Lock timeout, I/O failure during an atomic write, or backup failure.
    /// Transient-class: safe to retry.
    Storage(String),
    /// Lock acquisition exceeded its bounded wait. A distinguished `Storage` case
    /// so callers can match on it without string-sniffing the message.
    LockTimeout(String),
    /// A migration-specific failure, with its subkind per [`MigrationErrorKind`].
    Migration(MigrationErrorKind, String),
    /// Underlying I/O error not otherwise classified above.
    Io(String),
    /// Anything else.
    Other(String),
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryError::Validation(msg) => write!(f, "validation error: {}", msg),
            LibraryError::NotFound(msg) => write!(f, "not found: {}", msg),
            LibraryError::DataCorrupt(msg) => write!(f, "data corrupt: {}", msg),
            LibraryError::Storage(msg) => write!(f, "storage error: {}", msg),
            LibraryError::LockTimeout(msg) => write!(f, "lock timeout: {}", msg),
            LibraryError::Migration(kind, msg) => write!(f, "migration error ({}): {}", kind, msg),
            LibraryError::Io(msg) => write!(f, "I/O error: {}", msg),
            LibraryError::Other(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<std::io::Error> for LibraryError {
    fn from(error: std::io::Error) -> Self {
        LibraryError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(error: serde_json::Error) -> Self {
        LibraryError::DataCorrupt(format!("JSON error: {}", error))
    }
}

/// Status of a public operation's structured result (see spec §7).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum OperationStatus {
    Success,
    Error,
}

/// The structured result object every public core operation returns on its
/// fallible boundary: a status, a short human message, and typed details.
/// No panic or raw exception ever escapes the public surface; this is the
/// only shape a caller (CLI, future protocol layer) needs to render.
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome<T: Serialize> {
    pub status: OperationStatus,
    pub message: String,
    pub data: Option<T>,
    pub error: Option<LibraryError>,
}

impl<T: Serialize> OperationOutcome<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            status: OperationStatus::Success,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>, error: LibraryError) -> Self {
        Self {
            status: OperationStatus::Error,
            message: message.into(),
            data: None,
            error: Some(error),
        }
    }

    /// Build an outcome from a `Result`, using `context` as the success message
    /// and the error's `Display` as the failure message.
    pub fn from_result(context: &str, result: Result<T, LibraryError>) -> Self {
        match result {
            Ok(data) => Self::success(context.to_string(), data),
            Err(err) => {
                let message = format!("{}: {}", context, err);
                Self::error(message, err)
            }
        }
    }
}
