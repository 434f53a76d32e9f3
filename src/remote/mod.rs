//! Transfer of archives to and from an object store.
//!
//! [`ObjectStore`] is the seam to the storage provider; [`RemoteTransferClient`]
//! adds the local-side checks and logging the orchestrator relies on. Transfers
//! are single-shot: no resume and no checksum beyond what the transport provides.
pub mod s3;

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::errors::{BackupError, Result};

/// Location of an object in a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObjectRef {
    pub bucket: String,
    pub key: String,
}

impl RemoteObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parses `s3://bucket/key`.
    pub fn parse(uri: &str) -> anyhow::Result<Self> {
        let (bucket, key) = crate::restore::s3_download::parse_s3_uri(uri)?;
        Ok(Self { bucket, key })
    }

    /// Final path component of the key, used to name the local copy.
    ///
    /// `None` when the key has no usable final component, such as one ending
    /// in `..`.
    pub fn file_name(&self) -> Option<&str> {
        Path::new(&self.key).file_name().and_then(|n| n.to_str())
    }
}

impl fmt::Display for RemoteObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// Builds the object key for an archive: `{prefix}/{file_name}`, or just the
/// file name when the prefix is empty. A trailing `/` on the prefix is ignored.
pub fn remote_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

/// Minimal put/get interface over a bucket-addressed blob store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `local_file` under `bucket`/`key`, replacing any existing object.
    async fn put_object(&self, bucket: &str, key: &str, local_file: &Path) -> Result<()>;

    /// Writes the object to `local_file` and returns the number of bytes written.
    ///
    /// Must fail with `RemoteObjectNotFound` without creating `local_file` when
    /// the key does not exist.
    async fn get_object(&self, bucket: &str, key: &str, local_file: &Path) -> Result<u64>;
}

pub struct RemoteTransferClient<S> {
    store: S,
}

impl<S: ObjectStore> RemoteTransferClient<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Uploads `local_file` to `bucket`/`key`. Re-uploading a key overwrites it.
    pub async fn upload(&self, local_file: &Path, bucket: &str, key: &str) -> Result<RemoteObjectRef> {
        if !local_file.is_file() {
            return Err(BackupError::LocalFileNotFound(local_file.to_path_buf()));
        }
        let target = RemoteObjectRef::new(bucket, key);

        info!(file = %local_file.display(), remote = %target, "Uploading");
        self.store.put_object(bucket, key, local_file).await?;
        info!(remote = %target, "✓ Upload completed");

        Ok(target)
    }

    /// Downloads `bucket`/`key` to `local_file`, creating its parent directories.
    pub async fn download(&self, bucket: &str, key: &str, local_file: &Path) -> Result<PathBuf> {
        if let Some(parent) = local_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                BackupError::from_io(
                    e,
                    format!("create download directory {}", parent.display()),
                    BackupError::Internal,
                )
            })?;
        }
        let source = RemoteObjectRef::new(bucket, key);

        info!(remote = %source, file = %local_file.display(), "Downloading");
        let bytes = self.store.get_object(bucket, key, local_file).await?;
        info!(remote = %source, bytes, "✓ Download completed");

        Ok(local_file.to_path_buf())
    }
}
