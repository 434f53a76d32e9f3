use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Coarse classification of a failure, for callers that branch on the outcome.
///
/// The `Display` text of [`BackupError`] is a diagnostic only; match on the
/// kind instead of parsing the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    SourceNotFound,
    ArchiveNotFound,
    ArchiveWriteFailed,
    ExtractionFailed,
    LocalFileNotFound,
    RemoteObjectNotFound,
    RemoteServiceError,
    PermissionDenied,
    InternalError,
}

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Source directory does not exist: {}", .0.display())]
    SourceNotFound(PathBuf),

    #[error("Backup archive does not exist: {}", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("Failed to write archive {}: {message}", .path.display())]
    ArchiveWriteFailed { path: PathBuf, message: String },

    #[error("Failed to extract archive {}: {message}", .archive.display())]
    ExtractionFailed { archive: PathBuf, message: String },

    #[error("Local file does not exist: {}", .0.display())]
    LocalFileNotFound(PathBuf),

    #[error("Remote object not found: s3://{bucket}/{key}")]
    RemoteObjectNotFound { bucket: String, key: String },

    #[error("Remote storage error: {0}")]
    RemoteService(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackupError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BackupError::SourceNotFound(_) => ErrorKind::SourceNotFound,
            BackupError::ArchiveNotFound(_) => ErrorKind::ArchiveNotFound,
            BackupError::ArchiveWriteFailed { .. } => ErrorKind::ArchiveWriteFailed,
            BackupError::ExtractionFailed { .. } => ErrorKind::ExtractionFailed,
            BackupError::LocalFileNotFound(_) => ErrorKind::LocalFileNotFound,
            BackupError::RemoteObjectNotFound { .. } => ErrorKind::RemoteObjectNotFound,
            BackupError::RemoteService(_) => ErrorKind::RemoteServiceError,
            BackupError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            BackupError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Maps an I/O error hit while writing `path` into an archive.
    pub(crate) fn archive_write(path: &Path, err: impl std::fmt::Display) -> Self {
        BackupError::ArchiveWriteFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn extraction(archive: &Path, err: impl std::fmt::Display) -> Self {
        BackupError::ExtractionFailed {
            archive: archive.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Permission errors become `PermissionDenied`; anything else goes through `otherwise`.
    pub(crate) fn from_io(
        err: io::Error,
        what: impl std::fmt::Display,
        otherwise: impl FnOnce(String) -> Self,
    ) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            BackupError::PermissionDenied(format!("{}: {}", what, err))
        } else {
            otherwise(format!("{}: {}", what, err))
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
