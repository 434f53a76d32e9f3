// dirbackup/src/backup/s3_upload.rs
use aws_sdk_s3 as s3;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use std::path::Path;
use tracing::debug;

use crate::errors::{BackupError, Result};

/// Uploads a file to an S3-compatible object storage service.
///
/// The whole file is sent with a single `PutObject`; an existing object under
/// `s3_key` is replaced.
pub async fn upload_file_to_s3(
    client: &s3::Client,
    bucket: &str,
    file_path: &Path,
    s3_key: &str,
) -> Result<()> {
    debug!(
        "Attempting to upload {} to S3 bucket {} with key {}",
        file_path.display(),
        bucket,
        s3_key
    );

    let body = ByteStream::from_path(file_path).await.map_err(|e| {
        BackupError::Internal(format!(
            "Failed to create ByteStream from file {}: {}",
            file_path.display(),
            e
        ))
    })?;

    client
        .put_object()
        .bucket(bucket)
        .key(s3_key)
        .body(body)
        .send()
        .await
        .map_err(|e| {
            BackupError::RemoteService(format!(
                "Failed to upload {} to s3://{}/{}: {}",
                file_path.display(),
                bucket,
                s3_key,
                DisplayErrorContext(&e)
            ))
        })?;

    Ok(())
}
