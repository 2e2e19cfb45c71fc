//! Key-value publisher consumer

use std::sync::{Mutex, PoisonError};
use tracing::{debug, error, info, trace, warn};

use super::metrics::{DerivedMetrics, Odometer};
use crate::dispatcher::Observer;
use crate::sink::KeyValueSink;
use crate::types::TelemetryFrame;
use crate::{DecodeError, TransportError};

/// Observer that publishes [`DerivedMetrics`] to a [`KeyValueSink`]
///
/// Only race-active frames are published. Sink failures are logged and the
/// rest of that frame's keys are skipped; the next frame tries again.
pub struct KeyValuePublisher<S> {
    sink: S,
    odometer: Mutex<Odometer>,
}

impl<S: KeyValueSink> KeyValuePublisher<S> {
    pub fn new(sink: S) -> Self {
        Self { sink, odometer: Mutex::new(Odometer::new()) }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Current odometer reading in km
    pub fn distance_km(&self) -> f32 {
        self.odometer().distance_km()
    }

    fn odometer(&self) -> std::sync::MutexGuard<'_, Odometer> {
        self.odometer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn publish(&self, metrics: &DerivedMetrics) {
        for (key, value) in metrics.entries() {
            if let Err(e) = self.sink.set(key, &value).await {
                warn!(key, error = %e, "Failed to publish metric, skipping frame");
                return;
            }
        }
        trace!(speed = metrics.speed, odometer_km = metrics.truck_odometer_km, "Published frame");
    }
}

#[async_trait::async_trait]
impl<S: KeyValueSink> Observer for KeyValuePublisher<S> {
    async fn on_next(&self, frame: &TelemetryFrame) {
        // Guard must be released before awaiting the sink
        let metrics = {
            let mut odometer = self.odometer();
            if !frame.core.is_race_active {
                odometer.pause();
                None
            } else {
                let distance = odometer.advance(frame);
                Some(DerivedMetrics::from_frame(frame, distance))
            }
        };

        match metrics {
            Some(metrics) => self.publish(&metrics).await,
            None => debug!(timestamp_ms = frame.core.timestamp_ms, "Race not active, skipping"),
        }
    }

    async fn on_decode_error(&self, error: &DecodeError) {
        debug!(error = %error, "Ignoring undecodable datagram");
    }

    async fn on_transport_error(&self, error: &TransportError) {
        error!(error = %error, "Telemetry feed failed");
    }

    async fn on_completed(&self) {
        let distance = {
            let mut odometer = self.odometer();
            let distance = odometer.distance_km();
            odometer.reset();
            distance
        };
        info!(distance_km = distance, "Telemetry feed completed, odometer reset");
    }
}
