//! Key/value persistence.
//!
//! A small adapter surface (`get` / `put` over a fixed key namespace) used by
//! the dataset cache, the favorites mirror and saved filter preferences.
//! Values are JSON strings; [`get_json`] and [`put_json`] handle the encoding.

mod error;
mod file;
mod memory;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use error::PersistenceError;
pub use file::FileStore;
pub use memory::MemoryStore;

/// The fixed set of keys this crate persists under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Last successfully fetched dataset snapshot.
    DatasetCache,
    /// Anonymous favorites plus per-user offline mirrors.
    Favorites,
    /// Saved filter preferences.
    Filters,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::DatasetCache => "dataset-cache",
            StoreKey::Favorites => "favorites-v1",
            StoreKey::Filters => "filters-v1",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key/value storage backend.
///
/// `put` replaces the whole value atomically: a reader sees either the old
/// value or the new one, never a mix.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(
        &self,
        key: StoreKey,
    ) -> impl Future<Output = Result<Option<String>, PersistenceError>> + Send;

    fn put(
        &self,
        key: StoreKey,
        value: String,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send;
}

impl<S: KeyValueStore> KeyValueStore for Arc<S> {
    fn get(
        &self,
        key: StoreKey,
    ) -> impl Future<Output = Result<Option<String>, PersistenceError>> + Send {
        (**self).get(key)
    }

    fn put(
        &self,
        key: StoreKey,
        value: String,
    ) -> impl Future<Output = Result<(), PersistenceError>> + Send {
        (**self).put(key, value)
    }
}

/// Read and decode a JSON value.
pub async fn get_json<T, S>(store: &S, key: StoreKey) -> Result<Option<T>, PersistenceError>
where
    T: DeserializeOwned,
    S: KeyValueStore,
{
    let Some(raw) = store.get(key).await? else {
        return Ok(None);
    };

    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| PersistenceError::Corrupt {
            key,
            message: e.to_string(),
        })
}

/// Encode and write a JSON value.
pub async fn put_json<T, S>(store: &S, key: StoreKey, value: &T) -> Result<(), PersistenceError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore,
{
    let json = serde_json::to_string(value).map_err(|e| PersistenceError::Serialize {
        key,
        message: e.to_string(),
    })?;

    store.put(key, json).await
}
