//! Station dataset acquisition and caching.
//!
//! The whole country's station list is fetched in one request. The last
//! successful fetch is cached with its timestamp and reused while it is
//! younger than the TTL.

mod cache;
mod client;
mod error;
mod loader;
mod service;
mod snapshot;
mod types;

use std::future::Future;
use std::sync::Arc;

pub use cache::{DEFAULT_TTL, DatasetCache};
pub use client::{DEFAULT_DATASET_URL, DatasetClient, DatasetClientConfig};
pub use error::FetchError;
pub use loader::{DatasetLoader, LoadedDataset, SnapshotOrigin};
pub use service::{DatasetHandle, DatasetService, DatasetState, MIN_REFRESH_INTERVAL};
pub use snapshot::DatasetSnapshot;
pub use types::{LIST_FIELD, StationRecord, parse_stations};

/// Something that can produce a full dataset snapshot.
///
/// This abstraction allows the loader to be tested without the network.
pub trait DatasetSource: Send + Sync + 'static {
    /// Perform one retrieval of the full dataset.
    fn fetch(&self) -> impl Future<Output = Result<DatasetSnapshot, FetchError>> + Send;
}

impl<T: DatasetSource> DatasetSource for Arc<T> {
    fn fetch(&self) -> impl Future<Output = Result<DatasetSnapshot, FetchError>> + Send {
        (**self).fetch()
    }
}
