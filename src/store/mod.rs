//! Naming, placement and enumeration of backup archives on local storage.
//!
//! Archives are named `backup_{source}_{YYYYMMDD_HHMMSS}.zip`. The timestamp has
//! one-second granularity, so names sort by creation time and two backups of the
//! same source taken in the same second share a name (the later one overwrites).
use chrono::{Local, NaiveDateTime};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{BackupError, Result};

pub const ARCHIVE_PREFIX: &str = "backup_";
pub const ARCHIVE_EXTENSION: &str = ".zip";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Name used when the source path has no final component (`/`, `..`).
const FALLBACK_SOURCE_NAME: &str = "root";

/// A backup archive found in a local backup directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub source_name: String,
    pub created_at: NaiveDateTime,
    pub size_bytes: u64,
}

/// Base name of a source directory as embedded in archive names.
pub fn source_name(source_dir: &Path) -> String {
    source_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| FALLBACK_SOURCE_NAME.to_string())
}

pub fn backup_file_name(source_dir: &Path, timestamp: NaiveDateTime) -> String {
    format!(
        "{}{}_{}{}",
        ARCHIVE_PREFIX,
        source_name(source_dir),
        timestamp.format(TIMESTAMP_FORMAT),
        ARCHIVE_EXTENSION
    )
}

/// Full path of the archive a backup of `source_dir` taken now would produce.
/// Pure naming; nothing is touched on disk.
pub fn resolve_backup_path(source_dir: &Path, target_dir: &Path) -> PathBuf {
    resolve_backup_path_at(source_dir, target_dir, Local::now().naive_local())
}

pub fn resolve_backup_path_at(
    source_dir: &Path,
    target_dir: &Path,
    timestamp: NaiveDateTime,
) -> PathBuf {
    target_dir.join(backup_file_name(source_dir, timestamp))
}

/// Creates `path` and any missing parents. Succeeds if it already exists as a directory.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Splits an archive file name back into its source name and timestamp.
/// Returns `None` for files that do not follow the naming scheme.
pub fn parse_backup_file_name(file_name: &str) -> Option<(String, NaiveDateTime)> {
    let stem = file_name
        .strip_prefix(ARCHIVE_PREFIX)?
        .strip_suffix(ARCHIVE_EXTENSION)?;
    // "YYYYMMDD_HHMMSS" is 15 bytes, preceded by the separating underscore.
    let split = stem.len().checked_sub(16)?;
    if !stem.is_char_boundary(split) {
        return None;
    }
    let (name, rest) = stem.split_at(split);
    let timestamp = rest.strip_prefix('_')?;
    if name.is_empty() {
        return None;
    }
    let created_at = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;
    Some((name.to_string(), created_at))
}

/// Lists the archives in `backup_dir`, oldest first.
///
/// Files that do not match the naming scheme are ignored. A missing directory
/// is treated as holding no backups.
pub fn list_backups(backup_dir: &Path) -> Result<Vec<BackupEntry>> {
    let read_dir = match fs::read_dir(backup_dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(BackupError::from_io(
                e,
                format!("read backup directory {}", backup_dir.display()),
                BackupError::Internal,
            ));
        }
    };

    let mut backups = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| {
            BackupError::from_io(
                e,
                format!("read backup directory {}", backup_dir.display()),
                BackupError::Internal,
            )
        })?;
        let metadata = match entry.metadata() {
            Ok(m) if m.is_file() => m,
            _ => continue,
        };
        let file_name = entry.file_name();
        let Some((source_name, created_at)) = parse_backup_file_name(&file_name.to_string_lossy())
        else {
            continue;
        };
        backups.push(BackupEntry {
            path: entry.path(),
            source_name,
            created_at,
            size_bytes: metadata.len(),
        });
    }

    backups.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.path.cmp(&b.path)));
    Ok(backups)
}

/// Newest archive of `source_name` in `backup_dir`, if any.
pub fn latest_backup(backup_dir: &Path, source_name: &str) -> Result<Option<BackupEntry>> {
    Ok(list_backups(backup_dir)?
        .into_iter()
        .filter(|b| b.source_name == source_name)
        .next_back())
}

/// Removes a file or directory tree. A path that is already gone counts as removed.
pub fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(BackupError::from_io(
                e,
                format!("inspect {}", path.display()),
                BackupError::Internal,
            ));
        }
    };

    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match removed {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BackupError::from_io(
            e,
            format!("remove {}", path.display()),
            BackupError::Internal,
        )),
    }
}
