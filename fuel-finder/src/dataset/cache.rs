//! Persisted cache of the last fetched snapshot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::persistence::{KeyValueStore, PersistenceError, StoreKey, get_json, put_json};

use super::snapshot::DatasetSnapshot;

/// Default cache TTL: 60 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache for the station dataset, stored under [`StoreKey::DatasetCache`].
///
/// If the backing store turns out to be unusable, the cache switches itself
/// off and every later read misses and every later write is skipped, so the
/// pipeline carries on network-only.
pub struct DatasetCache<S> {
    store: S,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    enabled: AtomicBool,
}

impl<S: KeyValueStore> DatasetCache<S> {
    /// Create a cache with the default TTL and the system clock.
    pub fn new(store: S) -> Self {
        Self {
            store,
            ttl: DEFAULT_TTL,
            clock: Arc::new(SystemClock),
            enabled: AtomicBool::new(true),
        }
    }

    /// Set a custom TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Use a different clock for freshness checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The persisted snapshot, fresh or not.
    ///
    /// Storage and decoding problems are logged and read as a miss.
    pub async fn read(&self) -> Option<DatasetSnapshot> {
        if !self.is_enabled() {
            return None;
        }

        match get_json::<DatasetSnapshot, _>(&self.store, StoreKey::DatasetCache).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.note_failure(&e);
                None
            }
        }
    }

    /// Replace the persisted snapshot.
    ///
    /// A no-op once the cache has been disabled.
    pub async fn write(&self, snapshot: &DatasetSnapshot) -> Result<(), PersistenceError> {
        if !self.is_enabled() {
            debug!("dataset cache disabled, skipping write");
            return Ok(());
        }

        put_json(&self.store, StoreKey::DatasetCache, snapshot)
            .await
            .inspect_err(|e| self.note_failure(e))
    }

    /// Whether `snapshot` is younger than the TTL.
    pub fn is_fresh(&self, snapshot: &DatasetSnapshot) -> bool {
        self.is_fresh_at(snapshot.fetched_at, self.clock.now())
    }

    /// `now - fetched_at < ttl`. Timestamps from the future count as fresh.
    pub fn is_fresh_at(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match (now - fetched_at).to_std() {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }

    /// How long until `snapshot` goes stale. Zero if it already has.
    pub fn remaining_ttl(&self, snapshot: &DatasetSnapshot) -> Duration {
        let age = (self.clock.now() - snapshot.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.ttl.saturating_sub(age)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// False once persistence has failed with an unavailable-storage error.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn note_failure(&self, err: &PersistenceError) {
        if err.is_unavailable() {
            warn!(error = %err, "dataset cache unavailable, continuing network-only");
            self.enabled.store(false, Ordering::Relaxed);
        } else {
            warn!(error = %err, "ignoring unusable dataset cache entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::domain::{Station, StationId};
    use crate::persistence::{FileStore, MemoryStore};
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn snapshot(at: DateTime<Utc>) -> DatasetSnapshot {
        DatasetSnapshot::new(
            at,
            vec![Arc::new(Station::new(StationId::parse("1").unwrap(), "REPSOL"))],
        )
    }

    #[tokio::test]
    async fn write_then_read_is_fresh_until_ttl_elapses() {
        let clock = ManualClock::new(start());
        let cache = DatasetCache::new(MemoryStore::new()).with_clock(Arc::new(clock.clone()));

        cache.write(&snapshot(start())).await.unwrap();

        let loaded = cache.read().await.unwrap();
        assert_eq!(loaded.fetched_at, start());
        assert!(cache.is_fresh(&loaded));

        clock.advance(chrono::Duration::minutes(59));
        assert!(cache.is_fresh(&loaded));

        clock.advance(chrono::Duration::minutes(1));
        assert!(!cache.is_fresh(&loaded));

        // Stale entries are still returned by read
        assert!(cache.read().await.is_some());
    }

    #[test]
    fn freshness_boundary() {
        let cache = DatasetCache::new(MemoryStore::new());
        let ttl = chrono::Duration::minutes(60);

        assert!(cache.is_fresh_at(start(), start()));
        assert!(cache.is_fresh_at(start(), start() + ttl - chrono::Duration::seconds(1)));
        assert!(!cache.is_fresh_at(start(), start() + ttl));
        assert!(cache.is_fresh_at(start() + chrono::Duration::minutes(5), start()));
    }

    #[test]
    fn remaining_ttl_counts_down() {
        let clock = ManualClock::new(start());
        let cache = DatasetCache::new(MemoryStore::new()).with_clock(Arc::new(clock.clone()));
        let snap = snapshot(start());

        assert_eq!(cache.remaining_ttl(&snap), DEFAULT_TTL);

        clock.advance(chrono::Duration::minutes(45));
        assert_eq!(cache.remaining_ttl(&snap), Duration::from_secs(15 * 60));

        clock.advance(chrono::Duration::hours(2));
        assert_eq!(cache.remaining_ttl(&snap), Duration::ZERO);
    }

    #[tokio::test]
    async fn write_replaces_previous_entry() {
        let cache = DatasetCache::new(MemoryStore::new());
        let later = start() + chrono::Duration::hours(1);

        cache.write(&snapshot(start())).await.unwrap();
        cache
            .write(&DatasetSnapshot::new(later, Vec::new()))
            .await
            .unwrap();

        let loaded = cache.read().await.unwrap();
        assert_eq!(loaded.fetched_at, later);
        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn corrupt_entry_reads_as_miss_but_keeps_cache_enabled() {
        let store = MemoryStore::new();
        store
            .put(StoreKey::DatasetCache, "{broken".to_string())
            .await
            .unwrap();
        let cache = DatasetCache::new(store);

        assert!(cache.read().await.is_none());
        assert!(cache.is_enabled());
    }

    #[tokio::test]
    async fn unavailable_storage_disables_cache() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let cache = DatasetCache::new(FileStore::new(blocker.join("cache")));

        assert!(cache.write(&snapshot(start())).await.is_err());
        assert!(!cache.is_enabled());

        // Later calls degrade quietly
        assert!(cache.write(&snapshot(start())).await.is_ok());
        assert!(cache.read().await.is_none());
    }
}
