//! In-memory key/value store.

use moka::future::Cache as MokaCache;

use super::error::PersistenceError;
use super::{KeyValueStore, StoreKey};

/// Upper bound on stored keys; the namespace is small and fixed.
const MAX_ENTRIES: u64 = 16;

/// Process-local store, used for sessions without a writable disk and in tests.
///
/// Clones share the same entries.
#[derive(Clone)]
pub struct MemoryStore {
    entries: MokaCache<StoreKey, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: MokaCache::builder().max_capacity(MAX_ENTRIES).build(),
        }
    }

    /// Drop every stored value.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: StoreKey) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(&key).await)
    }

    async fn put(&self, key: StoreKey, value: String) -> Result<(), PersistenceError> {
        self.entries.insert(key, value).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_entries() {
        let store = MemoryStore::new();
        let other = store.clone();

        store.put(StoreKey::Filters, "{}".to_string()).await.unwrap();
        assert_eq!(
            other.get(StoreKey::Filters).await.unwrap().as_deref(),
            Some("{}")
        );
    }

    #[tokio::test]
    async fn invalidate_all_clears() {
        let store = MemoryStore::new();
        store.put(StoreKey::Filters, "{}".to_string()).await.unwrap();

        store.invalidate_all();

        assert!(store.get(StoreKey::Filters).await.unwrap().is_none());
    }
}
