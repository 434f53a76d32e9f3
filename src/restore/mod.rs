pub mod extract;     // Zip archive extraction
pub mod logic;       // Local and remote restore workflows
pub mod s3_download; // S3 GetObject and s3:// URI parsing

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::config::{AppConfig, ArchiveSource};
use crate::remote::s3::S3ObjectStore;
use crate::remote::RemoteTransferClient;
use crate::store;

/// Public entry point for the restore process.
pub async fn run_restore_flow(app_config: &AppConfig) -> Result<()> {
    let restore_config = match &app_config.operation {
        Some(crate::config::OperationConfig::Restore(cfg)) => cfg,
        _ => anyhow::bail!("Restore operation selected but no restore configuration found."),
    };
    let restore_dir = &restore_config.restore_dir;

    let restored = match &restore_config.archive_source {
        ArchiveSource::Local(archive_path) => logic::restore_backup(archive_path, restore_dir)
            .with_context(|| format!("Restore of {} failed", archive_path.display()))?,
        ArchiveSource::LatestLocal => {
            let archive_path = latest_local_archive(app_config)?;
            info!("Latest backup: {}", archive_path.display());
            logic::restore_backup(&archive_path, restore_dir)
                .with_context(|| format!("Restore of {} failed", archive_path.display()))?
        }
        ArchiveSource::Remote(remote) => {
            let s3_config = app_config
                .s3_config
                .as_ref()
                .context("S3 storage must be configured to restore from an s3:// URI")?;
            let client = RemoteTransferClient::new(S3ObjectStore::connect(s3_config).await);
            logic::restore_from_remote(
                &client,
                &remote.bucket,
                &remote.key,
                restore_dir,
                &app_config.staging_root,
            )
            .await
            .with_context(|| format!("Restore of {} failed", remote))?
        }
    };

    info!(
        "Restored {} files to {}",
        restored.file_count,
        restored.root.display()
    );
    Ok(())
}

/// Newest backup of the configured source directory in the local backup directory.
fn latest_local_archive(app_config: &AppConfig) -> Result<PathBuf> {
    let source_dir = app_config
        .raw_json_config
        .source_dir
        .as_ref()
        .context("source_dir must be set in config.json to restore the latest backup")?;
    let backup_dir = app_config.local_backup_dir()?;
    // The source may be gone by the time it is restored; fall back to the name as written.
    let source_name = store::source_name(&source_dir.canonicalize().unwrap_or_else(|_| source_dir.clone()));

    let latest = store::latest_backup(&backup_dir, &source_name)?.with_context(|| {
        format!(
            "No backup of '{}' found in {}",
            source_name,
            backup_dir.display()
        )
    })?;
    Ok(latest.path)
}
