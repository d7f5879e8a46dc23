//! Cancellable position watch.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{GeoError, PositionSensor, PositionUpdate, WatchOptions};

const UPDATE_CAPACITY: usize = 16;

/// A running subscription to a [`PositionSensor`].
///
/// The first fix (and the first fix after an error) must arrive within
/// [`WatchOptions::timeout`], otherwise [`GeoError::Timeout`] is reported
/// once and the watch keeps waiting. After [`cancel`](Self::cancel) or
/// drop, no further updates are delivered.
pub struct GeolocationWatch {
    updates: mpsc::Receiver<PositionUpdate>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl GeolocationWatch {
    pub fn start<P: PositionSensor>(sensor: P, options: WatchOptions) -> Self {
        let (tx, rx) = mpsc::channel(UPDATE_CAPACITY);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let task = tokio::spawn(run(sensor, options, tx, cancel_rx));

        Self {
            updates: rx,
            cancel: Some(cancel_tx),
            task,
        }
    }

    /// Next update, or `None` once the watch is cancelled or the sensor
    /// has gone away.
    pub async fn recv(&mut self) -> Option<PositionUpdate> {
        if self.cancel.is_none() {
            return None;
        }
        self.updates.recv().await
    }

    /// Stop watching. Updates already buffered are discarded.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
            self.updates.close();
            while self.updates.try_recv().is_ok() {}
            debug!("geolocation watch cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Drop for GeolocationWatch {
    fn drop(&mut self) {
        self.cancel();
        self.task.abort();
    }
}

async fn run<P: PositionSensor>(
    mut sensor: P,
    options: WatchOptions,
    updates: mpsc::Sender<PositionUpdate>,
    mut cancel: oneshot::Receiver<()>,
) {
    let mut awaiting_fix = true;

    loop {
        let reading = async {
            if awaiting_fix {
                match tokio::time::timeout(options.timeout, sensor.next_reading(&options)).await {
                    Ok(reading) => reading,
                    Err(_) => Some(Err(GeoError::Timeout)),
                }
            } else {
                sensor.next_reading(&options).await
            }
        };

        let update = tokio::select! {
            _ = &mut cancel => break,
            reading = reading => match reading {
                Some(update) => update,
                None => {
                    debug!("position sensor closed");
                    break;
                }
            },
        };

        match &update {
            Ok(_) => awaiting_fix = false,
            Err(GeoError::Timeout) => {
                warn!("no position fix within {:?}", options.timeout);
                awaiting_fix = false;
            }
            Err(e) => {
                warn!(error = %e, "geolocation error");
                awaiting_fix = true;
            }
        }

        if updates.send(update).await.is_err() {
            break;
        }
    }
}
