//! The derived view published by a session.

use chrono::{DateTime, Utc};

use crate::dataset::{DatasetState, SnapshotOrigin};
use crate::favorites::{FavoriteSet, SyncStatus};
use crate::filter::{
    FavoriteEntry, FilterCriteria, FilterOutcome, communities, evaluate, favorites_view,
    municipalities,
};
use crate::geo::{GeoError, PositionState};

/// Dataset availability as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetStatus {
    Loading,
    Ready {
        fetched_at: DateTime<Utc>,
        stations: usize,
        origin: SnapshotOrigin,
    },
    /// Nothing to show. Blocking until retried.
    Failed { message: String },
}

/// A non-blocking notice to show alongside the results.
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    /// Serving an old snapshot because the refresh failed.
    StaleData { reason: String },
    /// Distance filtering is off until a fresh fix arrives.
    Location(GeoError),
    Favorites { message: String },
}

/// The settled inputs of one recomputation.
#[derive(Debug, Clone)]
pub(crate) struct Inputs {
    pub dataset: DatasetState,
    pub criteria: FilterCriteria,
    pub position: PositionState,
    pub favorites: FavoriteSet,
    pub favorites_status: SyncStatus,
}

/// Everything the presentation layer needs, computed in one step from one
/// consistent set of inputs.
#[derive(Debug, Clone)]
pub struct PipelineView {
    pub dataset: DatasetStatus,
    pub criteria: FilterCriteria,
    pub position: PositionState,
    pub outcome: FilterOutcome,
    pub favorites: FavoriteSet,
    pub favorites_status: SyncStatus,
    /// Favorites present in the snapshot, by brand.
    pub favorite_stations: Vec<FavoriteEntry>,
    pub communities: Vec<String>,
    /// Municipalities of the selected community; empty when none is selected.
    pub municipalities: Vec<String>,
}

impl PipelineView {
    pub(crate) fn build(inputs: &Inputs) -> Self {
        let (dataset, derived) = match &inputs.dataset {
            DatasetState::Loading => (DatasetStatus::Loading, None),
            DatasetState::Failed(e) => (
                DatasetStatus::Failed {
                    message: e.to_string(),
                },
                None,
            ),
            DatasetState::Ready(loaded) => {
                let snapshot = &loaded.snapshot;
                let status = DatasetStatus::Ready {
                    fetched_at: snapshot.fetched_at,
                    stations: snapshot.len(),
                    origin: loaded.origin.clone(),
                };

                let outcome = evaluate(snapshot, &inputs.criteria, inputs.position.usable());
                let favorite_stations =
                    favorites_view(snapshot, &inputs.criteria.fuel, &inputs.favorites);
                let municipalities = inputs
                    .criteria
                    .community
                    .as_deref()
                    .map(|c| municipalities(snapshot, c))
                    .unwrap_or_default();

                (
                    status,
                    Some((outcome, favorite_stations, communities(snapshot), municipalities)),
                )
            }
        };

        let (outcome, favorite_stations, communities, municipalities) =
            derived.unwrap_or_default();

        Self {
            dataset,
            criteria: inputs.criteria.clone(),
            position: inputs.position,
            outcome,
            favorites: inputs.favorites.clone(),
            favorites_status: inputs.favorites_status.clone(),
            favorite_stations,
            communities,
            municipalities,
        }
    }

    /// The dataset failed and there is nothing to show.
    pub fn is_blocked(&self) -> bool {
        matches!(self.dataset, DatasetStatus::Failed { .. })
    }

    pub fn advisories(&self) -> Vec<Advisory> {
        let mut advisories = Vec::new();

        if let DatasetStatus::Ready {
            origin: SnapshotOrigin::Stale { reason },
            ..
        } = &self.dataset
        {
            advisories.push(Advisory::StaleData {
                reason: reason.clone(),
            });
        }
        if let Some(e) = self.position.error {
            advisories.push(Advisory::Location(e));
        }
        if let SyncStatus::Error { message, .. } = &self.favorites_status {
            advisories.push(Advisory::Favorites {
                message: message.clone(),
            });
        }

        advisories
    }
}
