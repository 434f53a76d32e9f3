// dirbackup/src/backup/logic.rs
use std::path::Path;
use tracing::info;

use super::archive::{create_archive, Archive};
use crate::errors::{BackupError, Result};
use crate::remote::{remote_key, ObjectStore, RemoteObjectRef, RemoteTransferClient};
use crate::utils::staging::{Phase, StagingArea, Workflow};

/// Outcome of a backup that ended up in the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBackup {
    pub archive_name: String,
    pub size_bytes: u64,
    pub file_count: usize,
    pub remote: RemoteObjectRef,
}

/// Backs up `source_dir` into `target_dir`, which is created if needed.
pub fn create_backup(source_dir: &Path, target_dir: &Path) -> Result<Archive> {
    create_archive(source_dir, target_dir)
}

/// Backs up `source_dir` to `bucket` under `prefix`.
///
/// 1. Staging: archive into a private directory under `staging_root`.
/// 2. Transferring: upload the archive to `{prefix}/{archive name}`.
/// 3. Finalizing: delete the staging directory, whatever happened before.
///
/// Nothing is retried. The first failure is returned after cleanup.
pub async fn backup_to_remote<S: ObjectStore>(
    client: &RemoteTransferClient<S>,
    source_dir: &Path,
    bucket: &str,
    prefix: &str,
    staging_root: &Path,
) -> Result<RemoteBackup> {
    // Checked before the staging directory exists, so a bad source leaves no trace.
    if !source_dir.is_dir() {
        return Err(BackupError::SourceNotFound(source_dir.to_path_buf()));
    }

    let mut workflow = Workflow::start("remote backup");
    let staging = match StagingArea::create(staging_root, "backup_staging") {
        Ok(staging) => staging,
        Err(e) => {
            let outcome = Err(e);
            workflow.finish(&outcome);
            return outcome;
        }
    };

    let outcome = stage_and_upload(client, source_dir, bucket, prefix, &staging, &mut workflow).await;

    workflow.enter(Phase::Finalizing);
    staging.finalize();
    workflow.finish(&outcome);

    if let Ok(backup) = &outcome {
        info!(
            remote = %backup.remote,
            size_bytes = backup.size_bytes,
            "🎉 Backup uploaded"
        );
    }
    outcome
}

async fn stage_and_upload<S: ObjectStore>(
    client: &RemoteTransferClient<S>,
    source_dir: &Path,
    bucket: &str,
    prefix: &str,
    staging: &StagingArea,
    workflow: &mut Workflow,
) -> Result<RemoteBackup> {
    let archive = create_archive(source_dir, staging.path())?;

    workflow.enter(Phase::Transferring);
    let archive_name = archive.file_name();
    let key = remote_key(prefix, &archive_name);
    let remote = client.upload(&archive.path, bucket, &key).await?;

    Ok(RemoteBackup {
        archive_name,
        size_bytes: archive.size_bytes,
        file_count: archive.file_count,
        remote,
    })
}
