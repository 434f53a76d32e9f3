// dirbackup/src/backup/archive.rs
use chrono::{Local, NaiveDateTime};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::{BackupError, Result};
use crate::store;

/// A backup archive written to local storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    pub source_name: String,
    pub created_at: NaiveDateTime,
    pub size_bytes: u64,
    pub file_count: usize,
}

impl Archive {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Creates a deflate-compressed zip archive of `source_dir` inside `destination_dir`.
///
/// Every regular file under `source_dir` is stored under its path relative to
/// `source_dir`. Directories are not stored; they are implied by the file paths,
/// so an empty source produces a valid archive with no entries.
///
/// An existing archive with the same name (same source, same second) is overwritten.
///
/// # Arguments
/// * `source_dir` - The directory whose contents will be archived.
/// * `destination_dir` - Directory that receives the archive; created if missing.
///
/// # Returns
/// The written [`Archive`], with its size read back from disk.
pub fn create_archive(source_dir: &Path, destination_dir: &Path) -> Result<Archive> {
    create_archive_at(source_dir, destination_dir, Local::now().naive_local())
}

/// Same as [`create_archive`], with the capture timestamp supplied by the caller.
pub fn create_archive_at(
    source_dir: &Path,
    destination_dir: &Path,
    created_at: NaiveDateTime,
) -> Result<Archive> {
    if !source_dir.is_dir() {
        return Err(BackupError::SourceNotFound(source_dir.to_path_buf()));
    }
    // Canonical form gives "." and "foo/.." a real base name.
    let source_root = source_dir.canonicalize().map_err(|e| {
        BackupError::from_io(e, format!("resolve {}", source_dir.display()), |_| {
            BackupError::SourceNotFound(source_dir.to_path_buf())
        })
    })?;

    let archive_path = store::resolve_backup_path_at(&source_root, destination_dir, created_at);

    store::ensure_dir(destination_dir).map_err(|e| {
        BackupError::from_io(
            e,
            format!("create backup directory {}", destination_dir.display()),
            |m| BackupError::archive_write(&archive_path, m),
        )
    })?;

    info!(
        source = %source_dir.display(),
        archive = %archive_path.display(),
        "Creating backup archive"
    );

    let file_count = match write_zip(&source_root, &archive_path) {
        Ok(count) => count,
        Err(e) => {
            // A half-written zip has no central directory; never leave it looking usable.
            if let Err(cleanup) = store::remove_path(&archive_path) {
                warn!(archive = %archive_path.display(), error = %cleanup, "Failed to remove partial archive");
            }
            return Err(e);
        }
    };

    let size_bytes = fs::metadata(&archive_path)
        .map_err(|e| {
            BackupError::from_io(
                e,
                format!("stat {}", archive_path.display()),
                |m| BackupError::archive_write(&archive_path, m),
            )
        })?
        .len();

    info!(
        archive = %archive_path.display(),
        files = file_count,
        size_mb = %format!("{:.2}", size_bytes as f64 / (1024.0 * 1024.0)),
        "✓ Backup archive created"
    );

    Ok(Archive {
        path: archive_path,
        source_name: store::source_name(&source_root),
        created_at,
        size_bytes,
        file_count,
    })
}

/// Streams every regular file under `source_root` into a new zip at `archive_path`.
fn write_zip(source_root: &Path, archive_path: &Path) -> Result<usize> {
    let archive_file = File::create(archive_path).map_err(|e| {
        BackupError::from_io(e, format!("create {}", archive_path.display()), |m| {
            BackupError::archive_write(archive_path, m)
        })
    })?;
    // When the archive lands inside the tree being archived, it must not archive itself.
    let archive_canonical = archive_path.canonicalize().ok();

    let mut zip = ZipWriter::new(BufWriter::new(archive_file));
    let mut file_count = 0usize;

    for entry in WalkDir::new(source_root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_default();
            match e.into_io_error() {
                Some(io_err) => BackupError::from_io(
                    io_err,
                    format!("walk {}", path.display()),
                    |m| BackupError::archive_write(archive_path, m),
                ),
                None => BackupError::archive_write(
                    archive_path,
                    format!("filesystem loop at {}", path.display()),
                ),
            }
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if archive_canonical.as_deref() == Some(path) {
            continue;
        }

        let relative = path
            .strip_prefix(source_root)
            .map_err(|e| BackupError::archive_write(archive_path, e))?;
        let entry_name = zip_entry_name(relative).ok_or_else(|| {
            BackupError::archive_write(
                archive_path,
                format!("non-UTF-8 path {} cannot be stored", path.display()),
            )
        })?;

        debug!(entry = %entry_name, "Adding file");

        let metadata = entry.metadata().map_err(|e| {
            BackupError::archive_write(archive_path, format!("stat {}: {}", path.display(), e))
        })?;
        let options = entry_options(&metadata);

        zip.start_file(entry_name.as_str(), options)
            .map_err(|e| BackupError::archive_write(archive_path, e))?;
        let mut source_file = File::open(path).map_err(|e| {
            BackupError::from_io(e, format!("open {}", path.display()), |m| {
                BackupError::archive_write(archive_path, m)
            })
        })?;
        io::copy(&mut source_file, &mut zip).map_err(|e| {
            BackupError::from_io(e, format!("copy {}", path.display()), |m| {
                BackupError::archive_write(archive_path, m)
            })
        })?;
        file_count += 1;
    }

    let mut writer = zip
        .finish()
        .map_err(|e| BackupError::archive_write(archive_path, e))?;
    io::Write::flush(&mut writer).map_err(|e| BackupError::archive_write(archive_path, e))?;

    Ok(file_count)
}

/// Zip entry names always use `/`, whatever the host separator.
///
/// `None` when a component is not valid UTF-8; a lossy name would restore
/// under a different path.
fn zip_entry_name(relative: &Path) -> Option<String> {
    relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()
        .map(|parts| parts.join("/"))
}

fn entry_options(metadata: &fs::Metadata) -> SimpleFileOptions {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(metadata.len() >= u32::MAX as u64);

    #[cfg(unix)]
    let options = {
        use std::os::unix::fs::PermissionsExt;
        options.unix_permissions(metadata.permissions().mode())
    };
    options
}
