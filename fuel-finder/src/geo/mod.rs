//! Geolocation intake.
//!
//! The host platform's position watch is abstracted as a [`PositionSensor`].
//! [`GeolocationWatch`] drives a sensor on its own task and forwards
//! readings or classified errors until cancelled; [`PositionState`] is the
//! consumer's view of the latest reading.

mod distance;
mod sensor;
mod state;
mod watch;

use std::future::Future;
use std::time::Duration;

use crate::domain::Coordinates;

pub use distance::{EARTH_RADIUS_KM, haversine_km};
pub use sensor::{ChannelSensor, SensorFeed};
pub use state::PositionState;
pub use watch::GeolocationWatch;

/// Classified geolocation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum GeoError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location information unavailable")]
    PositionUnavailable,

    #[error("location request timed out")]
    Timeout,

    #[error("unknown geolocation error")]
    Unknown,
}

/// One sensor reading or failure.
pub type PositionUpdate = Result<Coordinates, GeoError>;

/// Options passed to the host's position watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Ask for the most precise fix available.
    pub high_accuracy: bool,

    /// How long to wait for a fix before reporting [`GeoError::Timeout`].
    pub timeout: Duration,

    /// Oldest cached fix the host may return. Zero means always fresh.
    pub maximum_age: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }
}

/// The host platform's continuous position source.
pub trait PositionSensor: Send + 'static {
    /// Wait for the next reading. `None` means the sensor has shut down.
    fn next_reading(
        &mut self,
        options: &WatchOptions,
    ) -> impl Future<Output = Option<PositionUpdate>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options() {
        let options = WatchOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.maximum_age, Duration::ZERO);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            GeoError::PermissionDenied.to_string(),
            "location permission denied"
        );
        assert_eq!(GeoError::Timeout.to_string(), "location request timed out");
    }
}
