//! A user session.
//!
//! One task owns every input of the filter engine: the dataset state, the
//! filter criteria, the position and the favorite set. Each settled change
//! is applied on its own and followed by a full recomputation, published as
//! a fresh [`PipelineView`]. Text and radius edits pass through their own
//! debounce lanes first; everything else applies immediately.

mod view;

use std::sync::Arc;

use futures::StreamExt;
use futures::channel::mpsc as lane;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::dataset::DatasetHandle;
use crate::debounce::debounce;
use crate::domain::FuelKey;
use crate::favorites::FavoritesHandle;
use crate::filter::{SortMode, valid_radius};
use crate::geo::{GeolocationWatch, PositionState, PositionUpdate};
use crate::persistence::KeyValueStore;
use crate::preferences::FilterPreferences;

pub use view::{Advisory, DatasetStatus, PipelineView};

use view::Inputs;

#[derive(Debug)]
enum Command {
    SetFuel(FuelKey),
    SetQuery(String),
    SetMaxDistance(f64),
    SetSort(SortMode),
    SetCommunity(Option<String>),
    SetMunicipality(Option<String>),
    ClearFilters,
    RetryDataset,
    Shutdown,
}

/// Handle to a running session.
///
/// Setters return immediately; their effect shows up in the published view
/// once applied (after the debounce delay for the text query and radius).
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<Arc<PipelineView>>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn set_fuel(&self, fuel: FuelKey) {
        self.send(Command::SetFuel(fuel));
    }

    pub fn set_query(&self, query: impl Into<String>) {
        self.send(Command::SetQuery(query.into()));
    }

    /// Negative or non-finite radii are ignored.
    pub fn set_max_distance(&self, km: f64) {
        self.send(Command::SetMaxDistance(km));
    }

    pub fn set_sort(&self, sort: SortMode) {
        self.send(Command::SetSort(sort));
    }

    /// Select a community, or `None` for all. Clears the municipality.
    pub fn set_community(&self, community: Option<String>) {
        self.send(Command::SetCommunity(community));
    }

    pub fn set_municipality(&self, municipality: Option<String>) {
        self.send(Command::SetMunicipality(municipality));
    }

    /// Reset query, radius, area and sort. Pending debounced edits are
    /// discarded.
    pub fn clear_filters(&self) {
        self.send(Command::ClearFilters);
    }

    /// Retry the dataset after a blocking failure.
    pub fn retry_dataset(&self) {
        self.send(Command::RetryDataset);
    }

    /// The latest view.
    pub fn view(&self) -> Arc<PipelineView> {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PipelineView>> {
        self.view.clone()
    }

    /// Stop the session, cancelling geolocation and the dataset task.
    pub async fn shutdown(self) {
        self.send(Command::Shutdown);
        let _ = self.task.await;
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("session already stopped");
        }
    }
}

/// Starts sessions.
pub struct Session;

impl Session {
    /// Restore saved preferences and start the session task.
    ///
    /// `store` holds the saved filter preferences. `geolocation` is `None`
    /// when no position source is available; distance filtering then stays
    /// off.
    pub async fn spawn<S: KeyValueStore>(
        dataset: DatasetHandle,
        favorites: FavoritesHandle,
        geolocation: Option<GeolocationWatch>,
        store: S,
        config: &PipelineConfig,
    ) -> SessionHandle {
        let preferences = FilterPreferences::load(&store).await;

        let inputs = Inputs {
            dataset: dataset.state(),
            criteria: preferences.to_criteria(),
            position: PositionState::default(),
            favorites: favorites.favorites(),
            favorites_status: favorites.status(),
        };

        let (view_tx, view_rx) = watch::channel(Arc::new(PipelineView::build(&inputs)));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let task = SessionTask {
            inputs,
            dataset,
            favorites,
            geolocation,
            store,
            view: view_tx,
            radius_debounce: config.radius_debounce,
            query_debounce: config.query_debounce,
        };
        let task = tokio::spawn(task.run(commands_rx));

        SessionHandle {
            commands: commands_tx,
            view: view_rx,
            task,
        }
    }
}

struct SessionTask<S> {
    inputs: Inputs,
    dataset: DatasetHandle,
    favorites: FavoritesHandle,
    geolocation: Option<GeolocationWatch>,
    store: S,
    view: watch::Sender<Arc<PipelineView>>,
    radius_debounce: std::time::Duration,
    query_debounce: std::time::Duration,
}

impl<S: KeyValueStore> SessionTask<S> {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let (query_tx, query_rx) = lane::unbounded::<String>();
        let (radius_tx, radius_rx) = lane::unbounded::<f64>();
        let mut queries = Box::pin(debounce(query_rx, self.query_debounce));
        let mut radii = Box::pin(debounce(radius_rx, self.radius_debounce));

        let mut dataset_rx = self.dataset.subscribe();
        let mut favorites_rx = self.favorites.subscribe();
        let mut status_rx = self.favorites.subscribe_status();
        let mut dataset_open = true;
        let mut favorites_open = true;

        info!("session started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(Command::SetQuery(query)) => {
                        let _ = query_tx.unbounded_send(query);
                        continue;
                    }
                    Some(Command::SetMaxDistance(km)) => {
                        if valid_radius(km) {
                            let _ = radius_tx.unbounded_send(km);
                        } else {
                            warn!(km, "ignoring invalid radius");
                        }
                        continue;
                    }
                    Some(Command::ClearFilters) => {
                        self.inputs.criteria.clear();
                        // Supersede anything still pending in the lanes.
                        let _ = query_tx.unbounded_send(self.inputs.criteria.query.clone());
                        let _ = radius_tx.unbounded_send(self.inputs.criteria.max_distance_km);
                        self.save_preferences().await;
                    }
                    Some(command) => self.apply(command).await,
                },
                Some(query) = queries.next() => {
                    if query == self.inputs.criteria.query {
                        continue;
                    }
                    debug!(query = %query, "query settled");
                    self.inputs.criteria.query = query;
                }
                Some(km) = radii.next() => {
                    if km == self.inputs.criteria.max_distance_km {
                        continue;
                    }
                    debug!(km, "radius settled");
                    self.inputs.criteria.max_distance_km = km;
                    self.save_preferences().await;
                }
                update = next_position(&mut self.geolocation) => match update {
                    Some(update) => self.inputs.position.apply(update),
                    None => {
                        warn!("geolocation watch ended");
                        self.geolocation = None;
                        continue;
                    }
                },
                changed = dataset_rx.changed(), if dataset_open => match changed {
                    Ok(()) => self.inputs.dataset = dataset_rx.borrow_and_update().clone(),
                    Err(_) => {
                        dataset_open = false;
                        continue;
                    }
                },
                changed = favorites_rx.changed(), if favorites_open => match changed {
                    Ok(()) => self.inputs.favorites = favorites_rx.borrow_and_update().clone(),
                    Err(_) => {
                        favorites_open = false;
                        continue;
                    }
                },
                Ok(()) = status_rx.changed() => {
                    self.inputs.favorites_status = status_rx.borrow_and_update().clone();
                }
            }

            self.publish();
        }

        if let Some(mut watch) = self.geolocation.take() {
            watch.cancel();
        }
        self.dataset.shutdown();
        info!("session stopped");
    }

    async fn apply(&mut self, command: Command) {
        let criteria = &mut self.inputs.criteria;
        match command {
            Command::SetFuel(fuel) => {
                criteria.fuel = fuel;
                self.save_preferences().await;
            }
            Command::SetSort(sort) => {
                criteria.sort = sort;
                self.save_preferences().await;
            }
            Command::SetCommunity(community) => criteria.set_community(community),
            Command::SetMunicipality(municipality) => criteria.set_municipality(municipality),
            Command::RetryDataset => self.dataset.retry(),
            Command::SetQuery(_)
            | Command::SetMaxDistance(_)
            | Command::ClearFilters
            | Command::Shutdown => {}
        }
    }

    async fn save_preferences(&self) {
        FilterPreferences::from_criteria(&self.inputs.criteria)
            .save(&self.store)
            .await;
    }

    fn publish(&self) {
        let view = PipelineView::build(&self.inputs);
        debug!(
            visible = view.outcome.visible.len(),
            average = view.outcome.average_price,
            "view recomputed"
        );
        self.view.send_replace(Arc::new(view));
    }
}

async fn next_position(watch: &mut Option<GeolocationWatch>) -> Option<PositionUpdate> {
    match watch {
        Some(watch) => watch.recv().await,
        None => std::future::pending().await,
    }
}
