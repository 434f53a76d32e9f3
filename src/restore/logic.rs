// dirbackup/src/restore/logic.rs
use std::path::Path;
use tracing::info;

use super::extract::{extract_archive, RestoredTree};
use crate::errors::Result;
use crate::remote::{ObjectStore, RemoteObjectRef, RemoteTransferClient};
use crate::utils::staging::{Phase, StagingArea, Workflow};

/// Local name for a downloaded archive whose key has no usable file name.
const DEFAULT_ARCHIVE_NAME: &str = "archive.zip";

/// Restores a local archive into `restore_dir`.
pub fn restore_backup(archive_path: &Path, restore_dir: &Path) -> Result<RestoredTree> {
    extract_archive(archive_path, restore_dir)
}

/// Restores `bucket`/`key` into `restore_dir`.
///
/// 1. Staging: download the archive into a private directory under `staging_root`.
/// 2. Finalizing: extract it into `restore_dir`.
/// 3. Cleanup: delete the staging directory, whatever happened before.
///
/// Nothing is retried. If extraction fails partway, files already written to
/// `restore_dir` are left there.
pub async fn restore_from_remote<S: ObjectStore>(
    client: &RemoteTransferClient<S>,
    bucket: &str,
    key: &str,
    restore_dir: &Path,
    staging_root: &Path,
) -> Result<RestoredTree> {
    let mut workflow = Workflow::start("remote restore");
    let staging = match StagingArea::create(staging_root, "restore_staging") {
        Ok(staging) => staging,
        Err(e) => {
            let outcome = Err(e);
            workflow.finish(&outcome);
            return outcome;
        }
    };

    let outcome = download_and_extract(client, bucket, key, restore_dir, &staging, &mut workflow).await;

    staging.finalize();
    workflow.finish(&outcome);

    if let Ok(restored) = &outcome {
        info!(
            target = %restored.root.display(),
            files = restored.file_count,
            "🎉 Remote backup restored"
        );
    }
    outcome
}

async fn download_and_extract<S: ObjectStore>(
    client: &RemoteTransferClient<S>,
    bucket: &str,
    key: &str,
    restore_dir: &Path,
    staging: &StagingArea,
    workflow: &mut Workflow,
) -> Result<RestoredTree> {
    let source = RemoteObjectRef::new(bucket, key);
    let file_name = source.file_name().unwrap_or(DEFAULT_ARCHIVE_NAME);
    let local_archive = client
        .download(bucket, key, &staging.path().join(file_name))
        .await?;

    workflow.enter(Phase::Finalizing);
    extract_archive(&local_archive, restore_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::logic::{backup_to_remote, create_backup};
    use crate::errors::ErrorKind;
    use crate::test_support::{snapshot, MemoryObjectStore};
    use std::fs;

    fn staging_entries(staging_root: &Path) -> anyhow::Result<usize> {
        assert!(staging_root.is_dir(), "staging root was never created");
        Ok(fs::read_dir(staging_root)?.count())
    }

    #[test]
    fn test_restore_backup_local_scenario() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub"))?;
        fs::write(src.join("a.txt"), "hello")?;
        fs::write(src.join("sub/b.txt"), "world")?;

        let archive = create_backup(&src, &tmp.path().join("backups"))?;
        let restored = restore_backup(&archive.path, &tmp.path().join("restored"))?;

        assert_eq!(fs::read_to_string(restored.root.join("a.txt"))?, "hello");
        assert_eq!(fs::read_to_string(restored.root.join("sub/b.txt"))?, "world");
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_round_trip() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("sub/deeper"))?;
        fs::write(src.join("a.txt"), "hello")?;
        fs::write(src.join("sub/b.txt"), "world")?;
        fs::write(src.join("sub/deeper/c.bin"), [9u8; 4096])?;
        let staging_root = tmp.path().join("staging");
        let dest = tmp.path().join("dest");
        let client = RemoteTransferClient::new(MemoryObjectStore::default());

        let backup = backup_to_remote(&client, &src, "bucket", "backups/", &staging_root).await?;
        let restored = restore_from_remote(
            &client,
            &backup.remote.bucket,
            &backup.remote.key,
            &dest,
            &staging_root,
        )
        .await?;

        assert_eq!(restored.root, dest);
        assert_eq!(restored.file_count, 3);
        assert_eq!(snapshot(&src), snapshot(&dest));
        assert_eq!(staging_entries(&staging_root)?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_from_remote_missing_key() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let staging_root = tmp.path().join("staging");
        let dest = tmp.path().join("dest");
        let client = RemoteTransferClient::new(MemoryObjectStore::default());

        let err = restore_from_remote(&client, "bucket", "backups/none.zip", &dest, &staging_root)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteObjectNotFound);
        assert_eq!(staging_entries(&staging_root)?, 0);
        assert!(!dest.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_from_remote_corrupt_object_cleans_staging() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let staging_root = tmp.path().join("staging");
        let bogus = tmp.path().join("bogus.zip");
        fs::write(&bogus, b"not a zip at all")?;
        let client = RemoteTransferClient::new(MemoryObjectStore::default());
        client.upload(&bogus, "bucket", "bogus.zip").await?;

        let err = restore_from_remote(&client, "bucket", "bogus.zip", &tmp.path().join("dest"), &staging_root)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExtractionFailed);
        assert_eq!(staging_entries(&staging_root)?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_from_remote_service_error() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let staging_root = tmp.path().join("staging");
        let client = RemoteTransferClient::new(MemoryObjectStore::failing("SlowDown"));

        let err = restore_from_remote(&client, "bucket", "a.zip", &tmp.path().join("dest"), &staging_root)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::RemoteServiceError);
        assert_eq!(staging_entries(&staging_root)?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_restore_from_remote_key_without_file_name() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let src = tmp.path().join("src");
        fs::create_dir_all(&src)?;
        fs::write(src.join("a.txt"), "hello")?;
        let archive = create_backup(&src, &tmp.path().join("backups"))?;
        let staging_root = tmp.path().join("staging");
        let client = RemoteTransferClient::new(MemoryObjectStore::default());

        for (n, key) in ["backups/..", "..", "backups/"].into_iter().enumerate() {
            client.upload(&archive.path, "bucket", key).await?;
            let dest = tmp.path().join(format!("dest{}", n));

            let restored = restore_from_remote(&client, "bucket", key, &dest, &staging_root).await?;

            assert_eq!(restored.file_count, 1);
            assert_eq!(fs::read_to_string(dest.join("a.txt"))?, "hello");
            assert_eq!(staging_entries(&staging_root)?, 0);
        }
        Ok(())
    }
}
