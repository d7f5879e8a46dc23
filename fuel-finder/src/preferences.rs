//! Saved filter preferences.
//!
//! The fuel, radius and sort mode the user last settled on are kept under
//! `filters-v1` and restored when a session starts.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::FuelKey;
use crate::filter::{DEFAULT_RADIUS_KM, FilterCriteria, SortMode, valid_radius};
use crate::persistence::{KeyValueStore, StoreKey, get_json, put_json};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPreferences {
    pub fuel: FuelKey,
    pub max_distance_km: f64,
    pub sort: SortMode,
}

impl Default for FilterPreferences {
    fn default() -> Self {
        Self {
            fuel: FuelKey::default(),
            max_distance_km: DEFAULT_RADIUS_KM,
            sort: SortMode::default(),
        }
    }
}

impl FilterPreferences {
    pub fn from_criteria(criteria: &FilterCriteria) -> Self {
        Self {
            fuel: criteria.fuel.clone(),
            max_distance_km: criteria.max_distance_km,
            sort: criteria.sort,
        }
    }

    /// Criteria starting from these preferences, everything else default.
    pub fn to_criteria(&self) -> FilterCriteria {
        let radius = if valid_radius(self.max_distance_km) {
            self.max_distance_km
        } else {
            DEFAULT_RADIUS_KM
        };

        FilterCriteria::default()
            .with_fuel(self.fuel.clone())
            .with_max_distance(radius)
            .with_sort(self.sort)
    }

    /// Load saved preferences, falling back to defaults.
    pub async fn load<S: KeyValueStore>(store: &S) -> Self {
        match get_json(store, StoreKey::Filters).await {
            Ok(prefs) => prefs.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "could not read filter preferences, using defaults");
                Self::default()
            }
        }
    }

    /// Save preferences. Failures are logged and otherwise ignored.
    pub async fn save<S: KeyValueStore>(&self, store: &S) {
        if let Err(e) = put_json(store, StoreKey::Filters, self).await {
            warn!(error = %e, "could not save filter preferences");
        }
    }
}
