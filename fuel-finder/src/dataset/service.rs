//! Background dataset task.
//!
//! Owns a [`DatasetLoader`], publishes the current [`DatasetState`] on a
//! watch channel, refreshes when the served snapshot's TTL runs out, and
//! retries only when asked to after a blocking failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::persistence::KeyValueStore;

use super::DatasetSource;
use super::error::FetchError;
use super::loader::{DatasetLoader, LoadedDataset};
use super::snapshot::DatasetSnapshot;

/// Shortest wait between two scheduled refreshes, whatever the TTL.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// State of the dataset as seen by consumers.
#[derive(Debug, Clone)]
pub enum DatasetState {
    /// No snapshot yet, a load is in flight.
    Loading,
    /// A snapshot is being served.
    Ready(LoadedDataset),
    /// No snapshot could be obtained. Blocking; call [`DatasetHandle::retry`].
    Failed(Arc<FetchError>),
}

impl DatasetState {
    pub fn snapshot(&self) -> Option<&Arc<DatasetSnapshot>> {
        match self {
            DatasetState::Ready(loaded) => Some(&loaded.snapshot),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DatasetState::Loading)
    }
}

/// Handle to a running dataset task.
///
/// Dropping the handle stops the task.
pub struct DatasetHandle {
    state: watch::Receiver<DatasetState>,
    retry: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl DatasetHandle {
    /// The current state.
    pub fn state(&self) -> DatasetState {
        self.state.borrow().clone()
    }

    /// A receiver for state changes.
    pub fn subscribe(&self) -> watch::Receiver<DatasetState> {
        self.state.clone()
    }

    /// Ask for a network fetch now.
    ///
    /// Requests made while one is already queued are coalesced.
    pub fn retry(&self) {
        let _ = self.retry.try_send(());
    }

    /// Wait until the state is no longer [`DatasetState::Loading`].
    ///
    /// Returns the last published state if the task has stopped.
    pub async fn settled(&mut self) -> DatasetState {
        let settled = match self.state.wait_for(|s| !s.is_loading()).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| self.state.borrow().clone())
    }

    /// Stop the task.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Spawns the dataset task.
pub struct DatasetService;

impl DatasetService {
    /// Start loading immediately and keep the dataset current.
    pub fn spawn<F, S>(loader: DatasetLoader<F, S>) -> DatasetHandle
    where
        F: DatasetSource,
        S: KeyValueStore,
    {
        let (state_tx, state_rx) = watch::channel(DatasetState::Loading);
        let (retry_tx, retry_rx) = mpsc::channel(1);

        let task = tokio::spawn(run(loader, state_tx, retry_rx));

        DatasetHandle {
            state: state_rx,
            retry: retry_tx,
            task,
        }
    }
}

async fn run<F, S>(
    loader: DatasetLoader<F, S>,
    state: watch::Sender<DatasetState>,
    mut retry: mpsc::Receiver<()>,
) where
    F: DatasetSource,
    S: KeyValueStore,
{
    let mut next_refresh = publish(&loader, &state, loader.load().await);

    loop {
        let refresh_due = async move {
            match next_refresh {
                Some(delay) => tokio::time::sleep(delay).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            request = retry.recv() => {
                if request.is_none() {
                    break;
                }
                info!("dataset retry requested");
            }
            () = refresh_due => {
                info!("dataset TTL elapsed, refreshing");
            }
        }

        let current = state.borrow().snapshot().cloned();
        if current.is_none() {
            state.send_replace(DatasetState::Loading);
        }

        let result = loader.refresh(current).await;
        next_refresh = publish(&loader, &state, result);
    }
}

/// Publish a load result and work out when to refresh next.
///
/// Failures with nothing to serve wait for an explicit retry.
fn publish<F, S>(
    loader: &DatasetLoader<F, S>,
    state: &watch::Sender<DatasetState>,
    result: Result<LoadedDataset, FetchError>,
) -> Option<Duration>
where
    F: DatasetSource,
    S: KeyValueStore,
{
    match result {
        Ok(loaded) => {
            let delay = if loaded.origin.is_stale() {
                loader.ttl()
            } else {
                loader.time_until_stale(&loaded.snapshot)
            };
            state.send_replace(DatasetState::Ready(loaded));
            Some(delay.max(MIN_REFRESH_INTERVAL))
        }
        Err(e) => {
            error!(error = %e, "dataset unavailable");
            state.send_replace(DatasetState::Failed(Arc::new(e)));
            None
        }
    }
}
