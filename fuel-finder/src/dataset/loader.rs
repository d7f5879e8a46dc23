//! Cache-then-network loading policy.
//!
//! On startup a fresh cached snapshot is served without touching the
//! network. Otherwise the endpoint is fetched and the result written through
//! to the cache. When the fetch fails, whatever snapshot is still at hand
//! (cached or currently served) is kept, marked as stale.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::persistence::KeyValueStore;

use super::DatasetSource;
use super::cache::DatasetCache;
use super::error::FetchError;
use super::snapshot::DatasetSnapshot;

/// Where a served snapshot came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Cached and within TTL; the network was not used.
    Cache,
    /// Fetched just now.
    Network,
    /// The fetch failed and an older snapshot is being kept.
    Stale { reason: String },
}

impl SnapshotOrigin {
    pub fn is_stale(&self) -> bool {
        matches!(self, SnapshotOrigin::Stale { .. })
    }
}

/// A snapshot ready to be served.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub snapshot: Arc<DatasetSnapshot>,
    pub origin: SnapshotOrigin,
}

/// Composes a [`DatasetSource`] with a [`DatasetCache`].
pub struct DatasetLoader<F, S> {
    source: F,
    cache: DatasetCache<S>,
}

impl<F, S> DatasetLoader<F, S>
where
    F: DatasetSource,
    S: KeyValueStore,
{
    pub fn new(source: F, cache: DatasetCache<S>) -> Self {
        Self { source, cache }
    }

    /// Startup load: fresh cache first, network otherwise.
    ///
    /// Errors only when the fetch fails and there is no cached snapshot at all.
    pub async fn load(&self) -> Result<LoadedDataset, FetchError> {
        let cached = self.cache.read().await.map(Arc::new);

        if let Some(snapshot) = &cached
            && self.cache.is_fresh(snapshot)
        {
            info!(
                stations = snapshot.len(),
                fetched_at = %snapshot.fetched_at,
                "serving fresh cached dataset"
            );
            return Ok(LoadedDataset {
                snapshot: snapshot.clone(),
                origin: SnapshotOrigin::Cache,
            });
        }

        self.fetch_or_keep(cached).await
    }

    /// Fetch from the network regardless of cache freshness.
    ///
    /// `current` is the snapshot being served right now, if any; it is kept
    /// when the fetch fails and nothing newer is cached.
    pub async fn refresh(
        &self,
        current: Option<Arc<DatasetSnapshot>>,
    ) -> Result<LoadedDataset, FetchError> {
        let cached = self.cache.read().await.map(Arc::new);

        let fallback = match (cached, current) {
            (Some(c), Some(cur)) => Some(if c.fetched_at >= cur.fetched_at { c } else { cur }),
            (c, cur) => c.or(cur),
        };

        self.fetch_or_keep(fallback).await
    }

    /// How long until `snapshot` should be refreshed.
    pub fn time_until_stale(&self, snapshot: &DatasetSnapshot) -> Duration {
        self.cache.remaining_ttl(snapshot)
    }

    pub fn ttl(&self) -> Duration {
        self.cache.ttl()
    }

    async fn fetch_or_keep(
        &self,
        fallback: Option<Arc<DatasetSnapshot>>,
    ) -> Result<LoadedDataset, FetchError> {
        match self.source.fetch().await {
            Ok(snapshot) => {
                if let Err(e) = self.cache.write(&snapshot).await {
                    warn!(error = %e, "failed to cache dataset");
                }
                Ok(LoadedDataset {
                    snapshot: Arc::new(snapshot),
                    origin: SnapshotOrigin::Network,
                })
            }
            Err(e) => match fallback {
                Some(snapshot) => {
                    warn!(
                        error = %e,
                        fetched_at = %snapshot.fetched_at,
                        "dataset fetch failed, serving stale snapshot"
                    );
                    Ok(LoadedDataset {
                        snapshot,
                        origin: SnapshotOrigin::Stale {
                            reason: e.to_string(),
                        },
                    })
                }
                None => Err(e),
            },
        }
    }
}
