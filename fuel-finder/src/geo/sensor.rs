//! Channel-fed sensor.

use tokio::sync::mpsc;

use crate::domain::Coordinates;

use super::{GeoError, PositionSensor, PositionUpdate, WatchOptions};

/// Buffered readings before the feeder has to wait.
const FEED_CAPACITY: usize = 16;

/// A sensor whose readings are pushed in by the host through a [`SensorFeed`].
///
/// Hosts whose position API is callback-based forward each callback into
/// the feed.
pub struct ChannelSensor {
    readings: mpsc::Receiver<PositionUpdate>,
}

/// Sending side of a [`ChannelSensor`].
#[derive(Clone)]
pub struct SensorFeed {
    tx: mpsc::Sender<PositionUpdate>,
}

impl ChannelSensor {
    pub fn new() -> (Self, SensorFeed) {
        let (tx, rx) = mpsc::channel(FEED_CAPACITY);
        (Self { readings: rx }, SensorFeed { tx })
    }
}

impl PositionSensor for ChannelSensor {
    async fn next_reading(&mut self, _options: &WatchOptions) -> Option<PositionUpdate> {
        self.readings.recv().await
    }
}

impl SensorFeed {
    /// Push a successful fix. Returns false once the sensor is gone.
    pub async fn position(&self, coords: Coordinates) -> bool {
        self.tx.send(Ok(coords)).await.is_ok()
    }

    /// Push a failure. Returns false once the sensor is gone.
    pub async fn error(&self, error: GeoError) -> bool {
        self.tx.send(Err(error)).await.is_ok()
    }
}
