//! Dataset snapshots.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Station, StationId};

/// One full, timestamped copy of the station dataset.
///
/// Read-only once built. A newer snapshot replaces it wholesale; snapshots
/// are never merged record by record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    /// When the data was fetched from the endpoint.
    pub fetched_at: DateTime<Utc>,

    /// Stations in publication order. Ids are unique.
    pub stations: Vec<Arc<Station>>,
}

impl DatasetSnapshot {
    pub fn new(fetched_at: DateTime<Utc>, stations: Vec<Arc<Station>>) -> Self {
        Self {
            fetched_at,
            stations,
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Look up a station by id.
    pub fn get(&self, id: &StationId) -> Option<&Arc<Station>> {
        self.stations.iter().find(|s| &s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serde_roundtrip_preserves_timestamp_and_order() {
        let fetched_at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let stations = ["3", "1", "2"]
            .iter()
            .map(|id| Arc::new(Station::new(StationId::parse(id).unwrap(), "X")))
            .collect();
        let snapshot = DatasetSnapshot::new(fetched_at, stations);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: DatasetSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(back, snapshot);
        assert_eq!(back.stations[0].id.as_str(), "3");
    }

    #[test]
    fn get_by_id() {
        let snapshot = DatasetSnapshot::new(
            Utc::now(),
            vec![Arc::new(Station::new(StationId::parse("7").unwrap(), "X"))],
        );

        assert!(snapshot.get(&StationId::parse("7").unwrap()).is_some());
        assert!(snapshot.get(&StationId::parse("8").unwrap()).is_none());
    }
}
