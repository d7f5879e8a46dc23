//! Filter criteria.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::FuelKey;

/// Radius applied when the user has not chosen one, in kilometres.
pub const DEFAULT_RADIUS_KM: f64 = 10.0;

/// Primary ordering of the visible stations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Cheapest first, nearer first on ties.
    #[default]
    Price,
    /// Nearest first, cheaper first on ties.
    Distance,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Price => f.write_str("price"),
            SortMode::Distance => f.write_str("distance"),
        }
    }
}

/// What the user is looking for.
///
/// Every field is set independently. `query` and `max_distance_km` hold the
/// settled (debounced) values, not keystrokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub fuel: FuelKey,

    /// Free text matched against brand, municipality and province.
    pub query: String,

    pub max_distance_km: f64,

    pub sort: SortMode,

    /// Autonomous community (`CCAA`), exact match.
    pub community: Option<String>,

    /// Municipality within the community, exact match.
    pub municipality: Option<String>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            fuel: FuelKey::default(),
            query: String::new(),
            max_distance_km: DEFAULT_RADIUS_KM,
            sort: SortMode::default(),
            community: None,
            municipality: None,
        }
    }
}

impl FilterCriteria {
    pub fn with_fuel(mut self, fuel: FuelKey) -> Self {
        self.fuel = fuel;
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_max_distance(mut self, km: f64) -> Self {
        self.max_distance_km = km;
        self
    }

    pub fn with_sort(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    /// Select a community. A different community drops the municipality.
    pub fn set_community(&mut self, community: Option<String>) {
        let community = community.and_then(non_blank);
        if community != self.community {
            self.municipality = None;
        }
        self.community = community;
    }

    pub fn set_municipality(&mut self, municipality: Option<String>) {
        self.municipality = municipality.and_then(non_blank);
    }

    /// Reset everything except the fuel.
    pub fn clear(&mut self) {
        *self = Self {
            fuel: self.fuel.clone(),
            ..Self::default()
        };
    }

    /// The query ready for matching: trimmed and lowercased, `None` when
    /// there is nothing to match.
    pub fn needle(&self) -> Option<String> {
        let trimmed = self.query.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
    }
}

/// Whether `km` can be used as a radius.
pub fn valid_radius(km: f64) -> bool {
    km.is_finite() && km >= 0.0
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
