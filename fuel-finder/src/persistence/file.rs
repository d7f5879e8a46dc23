//! Disk-backed key/value store.

use std::io::ErrorKind;
use std::path::PathBuf;

use super::error::PersistenceError;
use super::{KeyValueStore, StoreKey};

/// Stores each key as `<dir>/<key>.json`.
///
/// Writes go to a temporary sibling file which is then renamed over the
/// target, so a crash mid-write leaves the previous value intact.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: StoreKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, PersistenceError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::unavailable("failed to read store file", e)),
        }
    }

    async fn put(&self, key: StoreKey, value: String) -> Result<(), PersistenceError> {
        if !self.dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| PersistenceError::unavailable("failed to create store directory", e))?;
        }

        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| PersistenceError::unavailable("failed to write store file", e))?;

        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| PersistenceError::unavailable("failed to replace store file", e))?;

        Ok(())
    }
}
