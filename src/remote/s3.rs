// dirbackup/src/remote/s3.rs
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use std::path::Path;
use tracing::debug;

use super::ObjectStore;
use crate::backup::s3_upload::upload_file_to_s3;
use crate::config::S3Config;
use crate::errors::Result;
use crate::restore::s3_download::download_file_from_s3;

/// [`ObjectStore`] backed by AWS S3 or an S3-compatible service.
pub struct S3ObjectStore {
    client: s3::Client,
}

impl S3ObjectStore {
    /// Builds a client from explicit settings. Ambient AWS profile and
    /// environment credentials are not consulted.
    pub async fn connect(s3_config: &S3Config) -> Self {
        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(s3_config.region.clone()))
            .credentials_provider(s3::config::Credentials::new(
                &s3_config.access_key_id,
                &s3_config.secret_access_key,
                None,     // session_token
                None,     // expiry
                "Static", // provider_name
            ));
        if let Some(endpoint_url) = &s3_config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }
        let sdk_config = loader.load().await;

        // Most S3-compatible services do not support virtual-hosted buckets.
        let client_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(s3_config.endpoint_url.is_some())
            .build();

        debug!(
            region = %s3_config.region,
            endpoint = ?s3_config.endpoint_url,
            "S3 client configured"
        );
        Self {
            client: s3::Client::from_conf(client_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, local_file: &Path) -> Result<()> {
        upload_file_to_s3(&self.client, bucket, local_file, key).await
    }

    async fn get_object(&self, bucket: &str, key: &str, local_file: &Path) -> Result<u64> {
        download_file_from_s3(&self.client, bucket, key, local_file).await
    }
}
