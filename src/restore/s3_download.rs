// dirbackup/src/restore/s3_download.rs
use anyhow::Context;
use aws_sdk_s3 as s3;
use s3::error::DisplayErrorContext;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt; // For write_all
use tracing::debug;

use crate::errors::{BackupError, Result};

/// Parses an S3 URI (s3://bucket/key) into bucket and key.
pub fn parse_s3_uri(s3_uri: &str) -> anyhow::Result<(String, String)> {
    let uri = url::Url::parse(s3_uri)
        .with_context(|| format!("Invalid S3 URI format: {}", s3_uri))?;
    if uri.scheme() != "s3" {
        return Err(anyhow::anyhow!("S3 URI must start with s3://"));
    }
    let bucket = uri.host_str().context("S3 URI missing bucket name")?.to_string();
    let key = uri.path().trim_start_matches('/').to_string();
    if key.is_empty() {
        return Err(anyhow::anyhow!("S3 URI missing key (object path)"));
    }
    Ok((bucket, key))
}

/// Downloads an object from an S3-compatible object storage service.
///
/// The destination file is only created once the object has been found, so a
/// missing key leaves nothing behind. If the transfer breaks off midway the
/// partial file is removed.
///
/// # Returns
/// Number of bytes written to `destination_path`.
pub async fn download_file_from_s3(
    client: &s3::Client,
    s3_bucket: &str,
    s3_key: &str,
    destination_path: &Path,
) -> Result<u64> {
    debug!(
        "Attempting to download s3://{}/{} to {}",
        s3_bucket,
        s3_key,
        destination_path.display()
    );

    let mut object = client
        .get_object()
        .bucket(s3_bucket)
        .key(s3_key)
        .send()
        .await
        .map_err(|e| {
            let not_found = e
                .as_service_error()
                .map(|se| se.is_no_such_key())
                .unwrap_or(false)
                || e.raw_response()
                    .map(|r| r.status().as_u16() == 404)
                    .unwrap_or(false);
            if not_found {
                BackupError::RemoteObjectNotFound {
                    bucket: s3_bucket.to_string(),
                    key: s3_key.to_string(),
                }
            } else {
                BackupError::RemoteService(format!(
                    "Failed to get object s3://{}/{}: {}",
                    s3_bucket,
                    s3_key,
                    DisplayErrorContext(&e)
                ))
            }
        })?;

    let mut output_file = File::create(destination_path).await.map_err(|e| {
        BackupError::from_io(
            e,
            format!("create {}", destination_path.display()),
            BackupError::Internal,
        )
    })?;

    let streamed: Result<u64> = async {
        let mut total_bytes_downloaded = 0u64;
        while let Some(bytes_chunk) = object.body.try_next().await.map_err(|e| {
            BackupError::RemoteService(format!(
                "Failed to read body of s3://{}/{}: {}",
                s3_bucket, s3_key, e
            ))
        })? {
            output_file.write_all(&bytes_chunk).await.map_err(|e| {
                BackupError::from_io(
                    e,
                    format!("write {}", destination_path.display()),
                    BackupError::Internal,
                )
            })?;
            total_bytes_downloaded += bytes_chunk.len() as u64;
        }
        output_file.flush().await.map_err(|e| {
            BackupError::from_io(
                e,
                format!("flush {}", destination_path.display()),
                BackupError::Internal,
            )
        })?;
        Ok(total_bytes_downloaded)
    }
    .await;

    if streamed.is_err() {
        drop(output_file);
        let _ = tokio::fs::remove_file(destination_path).await;
    }
    streamed
}
