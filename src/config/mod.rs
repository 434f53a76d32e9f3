// dirbackup/src/config/mod.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::remote::RemoteObjectRef;

/// Restores may name the newest local backup instead of a concrete file.
pub const LATEST_ARCHIVE: &str = "latest";

// Structs for deserializing config.json
#[derive(Debug, Clone, Deserialize)]
pub struct JsonS3StorageConfig {
    pub bucket_name: Option<String>,
    pub region: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub folder_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJsonConfig {
    pub source_dir: Option<PathBuf>,
    pub local_backup_dir: Option<PathBuf>,
    pub staging_root: Option<PathBuf>,
    pub archive_file_path_for_restore: Option<String>,
    pub restore_dir: Option<PathBuf>,
    pub s3_storage: Option<JsonS3StorageConfig>,
}

/// Connection settings for an S3-compatible object store.
///
/// Passed by value to the store constructor; nothing is read from global state.
#[derive(Clone)]
pub struct S3Config {
    pub bucket_name: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Custom endpoint for S3-compatible services; AWS is used when absent.
    pub endpoint_url: Option<String>,
    pub folder_prefix: String,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket_name", &self.bucket_name)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("endpoint_url", &self.endpoint_url)
            .field("folder_prefix", &self.folder_prefix)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub source_dir: PathBuf,
    pub local_backup_dir: PathBuf,
    pub upload_to_remote: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    Local(PathBuf),
    /// Newest local backup of the configured source directory.
    LatestLocal,
    Remote(RemoteObjectRef),
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub archive_source: ArchiveSource,
    pub restore_dir: PathBuf,
}

impl RestoreConfig {
    pub fn download_from_remote(&self) -> bool {
        matches!(self.archive_source, ArchiveSource::Remote(_))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub operation: Option<OperationConfig>,
    pub s3_config: Option<S3Config>,
    pub staging_root: PathBuf,
    pub raw_json_config: RawJsonConfig,
}

#[derive(Debug, Clone)]
pub enum OperationConfig {
    Backup(BackupConfig),
    Restore(RestoreConfig),
    List,
}

impl AppConfig {
    pub fn load_from_json(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file at {}", config_path.display()))?;
        Self::from_json_str(&config_content).with_context(|| {
            format!(
                "Failed to parse JSON from config file at {}",
                config_path.display()
            )
        })
    }

    pub fn from_json_str(config_content: &str) -> Result<Self> {
        let raw_json_config: RawJsonConfig = serde_json::from_str(config_content)?;

        let s3_config = raw_json_config
            .s3_storage
            .as_ref()
            .and_then(s3_config_from_raw);

        let staging_root = raw_json_config
            .staging_root
            .clone()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(std::env::temp_dir);

        Ok(AppConfig {
            operation: None, // To be filled by main after parsing CLI args
            s3_config,
            staging_root,
            raw_json_config,
        })
    }

    /// Directory local backups are written to and listed from.
    pub fn local_backup_dir(&self) -> Result<PathBuf> {
        let dir = self
            .raw_json_config
            .local_backup_dir
            .as_ref()
            .context("local_backup_dir must be set in config.json")?;
        if dir.as_os_str().is_empty() {
            anyhow::bail!("local_backup_dir cannot be empty in config.json.");
        }
        Ok(dir.clone())
    }
}

fn s3_config_from_raw(s3_raw: &JsonS3StorageConfig) -> Option<S3Config> {
    let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();

    if let (Some(bucket_name), Some(region), Some(access_key_id), Some(secret_access_key)) = (
        non_empty(&s3_raw.bucket_name),
        non_empty(&s3_raw.region),
        non_empty(&s3_raw.access_key_id),
        non_empty(&s3_raw.secret_access_key),
    ) {
        Some(S3Config {
            bucket_name,
            region,
            access_key_id,
            secret_access_key,
            endpoint_url: non_empty(&s3_raw.endpoint_url),
            folder_prefix: s3_raw.folder_prefix.clone().unwrap_or_default(),
        })
    } else {
        if s3_raw.bucket_name.is_some()
            || s3_raw.region.is_some()
            || s3_raw.access_key_id.is_some()
            || s3_raw.secret_access_key.is_some()
        {
            // Only warn if some S3 fields were provided but were incomplete/empty
            warn!("S3 configuration is present in config.json but some required fields (bucket_name, region, access_key_id, secret_access_key) are missing or empty. Remote operations will be disabled.");
        }
        None
    }
}

pub fn load_backup_config_from_json(
    app_config: &AppConfig,
) -> Result<BackupConfig> {
    let source_dir = app_config
        .raw_json_config
        .source_dir
        .as_ref()
        .context("source_dir must be set in config.json for backup")?
        .clone();

    if source_dir.as_os_str().is_empty() {
        anyhow::bail!("source_dir cannot be empty in config.json.");
    }

    Ok(BackupConfig {
        source_dir,
        local_backup_dir: app_config.local_backup_dir()?,
        upload_to_remote: app_config.s3_config.is_some(), // Upload whenever S3 is configured
    })
}

pub fn load_restore_config_from_json(
    app_config: &AppConfig,
) -> Result<RestoreConfig> {
    let raw_config = &app_config.raw_json_config;
    let archive_path = raw_config
        .archive_file_path_for_restore
        .as_ref()
        .context("archive_file_path_for_restore must be set in config.json for restore")?
        .trim();

    if archive_path.is_empty() {
        anyhow::bail!("archive_file_path_for_restore cannot be empty in config.json.");
    }

    let restore_dir = raw_config
        .restore_dir
        .as_ref()
        .context("restore_dir must be set in config.json for restore")?
        .clone();

    let archive_source = if archive_path.starts_with("s3://") {
        if app_config.s3_config.is_none() {
            anyhow::bail!(
                "archive_file_path_for_restore in config.json is an S3 URI, but S3 storage (s3_storage) is not fully configured or is missing required fields."
            );
        }
        ArchiveSource::Remote(RemoteObjectRef::parse(archive_path)?)
    } else if archive_path == LATEST_ARCHIVE {
        if raw_config.source_dir.is_none() {
            anyhow::bail!("archive_file_path_for_restore is \"latest\" but source_dir is not set in config.json.");
        }
        ArchiveSource::LatestLocal
    } else {
        ArchiveSource::Local(PathBuf::from(archive_path))
    };

    Ok(RestoreConfig {
        archive_source,
        restore_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn s3_block() -> serde_json::Value {
        json!({
            "bucket_name": "bucket",
            "region": "us-east-1",
            "access_key_id": "AKIA",
            "secret_access_key": "secret",
            "folder_prefix": "backups/"
        })
    }

    #[test]
    fn test_s3_config_complete() -> anyhow::Result<()> {
        let config = AppConfig::from_json_str(&json!({ "s3_storage": s3_block() }).to_string())?;

        let s3 = config.s3_config.expect("s3 config");
        assert_eq!(s3.bucket_name, "bucket");
        assert_eq!(s3.endpoint_url, None);
        assert_eq!(s3.folder_prefix, "backups/");
        assert!(!format!("{:?}", s3).contains("secret\""));
        Ok(())
    }

    #[test]
    fn test_s3_config_incomplete_is_disabled() -> anyhow::Result<()> {
        let config = AppConfig::from_json_str(
            &json!({ "s3_storage": { "bucket_name": "bucket", "region": "" } }).to_string(),
        )?;
        assert!(config.s3_config.is_none());
        Ok(())
    }

    #[test]
    fn test_staging_root_defaults_to_temp_dir() -> anyhow::Result<()> {
        let config = AppConfig::from_json_str("{}")?;
        assert_eq!(config.staging_root, std::env::temp_dir());

        let config = AppConfig::from_json_str(&json!({ "staging_root": "/var/tmp/x" }).to_string())?;
        assert_eq!(config.staging_root, PathBuf::from("/var/tmp/x"));
        Ok(())
    }

    #[test]
    fn test_backup_config() -> anyhow::Result<()> {
        let config = AppConfig::from_json_str(
            &json!({ "source_dir": "./data", "local_backup_dir": "./backups" }).to_string(),
        )?;
        let backup = load_backup_config_from_json(&config)?;
        assert_eq!(backup.source_dir, PathBuf::from("./data"));
        assert_eq!(backup.local_backup_dir, PathBuf::from("./backups"));
        assert!(!backup.upload_to_remote);

        let remote = AppConfig::from_json_str(
            &json!({ "source_dir": "./data", "local_backup_dir": "./backups", "s3_storage": s3_block() })
                .to_string(),
        )?;
        assert!(load_backup_config_from_json(&remote)?.upload_to_remote);
        Ok(())
    }

    #[test]
    fn test_backup_config_requires_source() -> anyhow::Result<()> {
        let config = AppConfig::from_json_str(&json!({ "local_backup_dir": "./b" }).to_string())?;
        assert!(load_backup_config_from_json(&config).is_err());
        Ok(())
    }

    #[test]
    fn test_restore_config_sources() -> anyhow::Result<()> {
        let local = AppConfig::from_json_str(
            &json!({
                "archive_file_path_for_restore": "./backups/backup_src_20240101_120000.zip",
                "restore_dir": "./restored"
            })
            .to_string(),
        )?;
        let restore = load_restore_config_from_json(&local)?;
        assert_eq!(
            restore.archive_source,
            ArchiveSource::Local(PathBuf::from("./backups/backup_src_20240101_120000.zip"))
        );
        assert!(!restore.download_from_remote());

        let remote = AppConfig::from_json_str(
            &json!({
                "archive_file_path_for_restore": "s3://bucket/backups/backup_src_20240101_120000.zip",
                "restore_dir": "./restored",
                "s3_storage": s3_block()
            })
            .to_string(),
        )?;
        let restore = load_restore_config_from_json(&remote)?;
        assert_eq!(
            restore.archive_source,
            ArchiveSource::Remote(RemoteObjectRef::new(
                "bucket",
                "backups/backup_src_20240101_120000.zip"
            ))
        );
        assert!(restore.download_from_remote());

        let latest = AppConfig::from_json_str(
            &json!({
                "source_dir": "./data",
                "archive_file_path_for_restore": "latest",
                "restore_dir": "./restored"
            })
            .to_string(),
        )?;
        assert_eq!(
            load_restore_config_from_json(&latest)?.archive_source,
            ArchiveSource::LatestLocal
        );
        Ok(())
    }

    #[test]
    fn test_restore_config_s3_uri_without_s3_storage() -> anyhow::Result<()> {
        let config = AppConfig::from_json_str(
            &json!({
                "archive_file_path_for_restore": "s3://bucket/key.zip",
                "restore_dir": "./restored"
            })
            .to_string(),
        )?;
        assert!(load_restore_config_from_json(&config).is_err());
        Ok(())
    }
}
