//! Shared fixtures for unit tests.
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use walkdir::WalkDir;

use crate::errors::{BackupError, Result};
use crate::remote::ObjectStore;

/// Relative path (with `/` separators) -> content, for every regular file under `root`.
pub fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap();
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (key, fs::read(e.path()).unwrap())
        })
        .collect()
}

/// Object store kept in memory. `failing` makes every call return a service error.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    failure: Option<String>,
}

impl MemoryObjectStore {
    pub fn failing(message: &str) -> Self {
        Self {
            objects: Mutex::default(),
            failure: Some(message.to_string()),
        }
    }

    pub fn keys(&self) -> Vec<(String, String)> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check(&self) -> Result<()> {
        match &self.failure {
            Some(message) => Err(BackupError::RemoteService(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, local_file: &Path) -> Result<()> {
        self.check()?;
        let data = fs::read(local_file).map_err(|e| BackupError::Internal(e.to_string()))?;
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str, local_file: &Path) -> Result<u64> {
        self.check()?;
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| BackupError::RemoteObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
        fs::write(local_file, &data).map_err(|e| BackupError::Internal(e.to_string()))?;
        Ok(data.len() as u64)
    }
}
