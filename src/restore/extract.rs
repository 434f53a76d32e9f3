// dirbackup/src/restore/extract.rs
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipArchive;

use crate::errors::{BackupError, Result};
use crate::store;

/// A directory tree materialized from an archive. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredTree {
    pub root: PathBuf,
    pub file_count: usize,
}

/// Extracts a zip archive into `extract_to_dir`.
///
/// Each entry is written to `extract_to_dir/<entry path>`, creating parent
/// directories as needed. Existing files with the same paths are replaced,
/// including ones a previous restore left read-only.
///
/// If an entry fails, extraction stops with `ExtractionFailed`. Files written
/// before the failure are left in place; callers that need all-or-nothing
/// semantics should extract into a fresh directory and discard it on error.
///
/// # Arguments
/// * `archive_path` - Path to the `.zip` archive.
/// * `extract_to_dir` - Target directory; created if missing.
pub fn extract_archive(archive_path: &Path, extract_to_dir: &Path) -> Result<RestoredTree> {
    if !archive_path.is_file() {
        return Err(BackupError::ArchiveNotFound(archive_path.to_path_buf()));
    }

    store::ensure_dir(extract_to_dir).map_err(|e| {
        BackupError::from_io(
            e,
            format!("create restore directory {}", extract_to_dir.display()),
            |m| BackupError::extraction(archive_path, m),
        )
    })?;

    info!(
        archive = %archive_path.display(),
        target = %extract_to_dir.display(),
        "Restoring backup"
    );

    let archive_file = File::open(archive_path).map_err(|e| {
        BackupError::from_io(e, format!("open {}", archive_path.display()), |m| {
            BackupError::extraction(archive_path, m)
        })
    })?;
    let mut archive = ZipArchive::new(BufReader::new(archive_file))
        .map_err(|e| BackupError::extraction(archive_path, e))?;

    let mut file_count = 0usize;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| BackupError::extraction(archive_path, e))?;
        let relative = entry.enclosed_name().ok_or_else(|| {
            BackupError::extraction(
                archive_path,
                format!("entry '{}' escapes the restore directory", entry.name()),
            )
        })?;
        let out_path = extract_to_dir.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| {
                BackupError::from_io(e, format!("create {}", out_path.display()), |m| {
                    BackupError::extraction(archive_path, m)
                })
            })?;
            continue;
        }

        debug!(entry = %entry.name(), "Restoring file");

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                BackupError::from_io(e, format!("create {}", parent.display()), |m| {
                    BackupError::extraction(archive_path, m)
                })
            })?;
        }
        // Replace rather than truncate: the old file may carry restored read-only bits.
        if fs::symlink_metadata(&out_path).is_ok_and(|m| !m.is_dir()) {
            fs::remove_file(&out_path).map_err(|e| {
                BackupError::from_io(e, format!("replace {}", out_path.display()), |m| {
                    BackupError::extraction(archive_path, m)
                })
            })?;
        }
        let mut out_file = File::create(&out_path).map_err(|e| {
            BackupError::from_io(e, format!("create {}", out_path.display()), |m| {
                BackupError::extraction(archive_path, m)
            })
        })?;
        io::copy(&mut entry, &mut out_file).map_err(|e| {
            BackupError::from_io(e, format!("write {}", out_path.display()), |m| {
                BackupError::extraction(archive_path, m)
            })
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                let permissions = fs::Permissions::from_mode(mode & 0o777);
                fs::set_permissions(&out_path, permissions).map_err(|e| {
                    BackupError::from_io(e, format!("chmod {}", out_path.display()), |m| {
                        BackupError::extraction(archive_path, m)
                    })
                })?;
            }
        }

        file_count += 1;
    }

    info!(
        target = %extract_to_dir.display(),
        files = file_count,
        "✓ Backup restored"
    );
    Ok(RestoredTree {
        root: extract_to_dir.to_path_buf(),
        file_count,
    })
}
