//! Consumer-side position state.

use serde::Serialize;

use crate::domain::Coordinates;

use super::{GeoError, PositionUpdate};

/// Latest known position plus the latest error.
///
/// A new fix replaces the old one and clears the error. An error keeps the
/// last fix around for display but makes the position unusable for
/// distance filtering until the next fix arrives.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PositionState {
    pub last_known: Option<Coordinates>,
    #[serde(skip)]
    pub error: Option<GeoError>,
}

impl PositionState {
    pub fn apply(&mut self, update: PositionUpdate) {
        match update {
            Ok(coords) => {
                self.last_known = Some(coords);
                self.error = None;
            }
            Err(e) => self.error = Some(e),
        }
    }

    /// The position to filter by, if there is a fix and no error since.
    pub fn usable(&self) -> Option<Coordinates> {
        match self.error {
            None => self.last_known,
            Some(_) => None,
        }
    }

    /// No fix and no error yet.
    pub fn is_pending(&self) -> bool {
        self.last_known.is_none() && self.error.is_none()
    }
}
