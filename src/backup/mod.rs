pub mod archive;   // Zip archive creation
pub mod logic;     // Local and remote backup workflows
pub mod s3_upload; // S3 PutObject

use anyhow::{Context, Result};
use tracing::info;

use crate::config::AppConfig;
use crate::remote::s3::S3ObjectStore;
use crate::remote::RemoteTransferClient;

/// Public entry point for the backup process.
/// Uploads to the object store when S3 is configured, otherwise writes to the
/// local backup directory.
pub async fn run_backup_flow(app_config: &AppConfig) -> Result<()> {
    let backup_config = match &app_config.operation {
        Some(crate::config::OperationConfig::Backup(cfg)) => cfg,
        _ => anyhow::bail!("Backup operation selected but no backup configuration found."),
    };

    match (&app_config.s3_config, backup_config.upload_to_remote) {
        (Some(s3_config), true) => {
            let client = RemoteTransferClient::new(S3ObjectStore::connect(s3_config).await);
            let backup = logic::backup_to_remote(
                &client,
                &backup_config.source_dir,
                &s3_config.bucket_name,
                &s3_config.folder_prefix,
                &app_config.staging_root,
            )
            .await
            .with_context(|| {
                format!("Remote backup of {} failed", backup_config.source_dir.display())
            })?;
            info!("Backup location: {}", backup.remote);
        }
        _ => {
            let archive = logic::create_backup(
                &backup_config.source_dir,
                &backup_config.local_backup_dir,
            )
            .with_context(|| format!("Backup of {} failed", backup_config.source_dir.display()))?;
            info!(
                "Backup location: {} ({} files, {} bytes)",
                archive.path.display(),
                archive.file_count,
                archive.size_bytes
            );
        }
    }
    Ok(())
}
