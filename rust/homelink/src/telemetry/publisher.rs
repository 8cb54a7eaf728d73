use super::{ReadingBounds, SensorReading};
use crate::error::{HomelinkError, Result};
use crate::topics;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use zenoh::prelude::r#async::*;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Periodic sensor simulator. One reading is published on `esp/sensors`
/// per tick; a failed publish is logged and the loop continues on the
/// next tick.
pub struct TelemetryPublisher {
    id: String,
    session: Arc<Session>,
    interval: Duration,
    bounds: Option<ReadingBounds>,
}

impl TelemetryPublisher {
    pub fn new(id: String, session: Arc<Session>) -> Self {
        Self {
            id,
            session,
            interval: DEFAULT_INTERVAL,
            bounds: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Enables the clamped simulator variant.
    pub fn with_bounds(mut self, bounds: ReadingBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let publisher = self
            .session
            .declare_publisher(topics::SENSORS)
            .res()
            .await
            .map_err(HomelinkError::ZenohError)?;

        info!(
            "Telemetry publisher {} started, interval {:?}",
            self.id, self.interval
        );

        while !cancel.is_cancelled() {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {
                    let mut reading = SensorReading::synthesize();
                    if let Some(bounds) = &self.bounds {
                        bounds.clamp(&mut reading);
                    }
                    match serde_json::to_string(&reading) {
                        Ok(payload) => {
                            if let Err(e) = publisher.put(payload).res().await {
                                warn!(
                                    "Telemetry publisher {} failed to publish, skipping tick: {}",
                                    self.id, e
                                );
                            } else {
                                debug!(
                                    "Telemetry publisher {} sent temp={} hum={} ldr={} pir={} ir={}",
                                    self.id, reading.temp, reading.hum, reading.ldr,
                                    reading.pir, reading.ir
                                );
                            }
                        }
                        Err(e) => warn!(
                            "Telemetry publisher {} failed to encode reading: {}",
                            self.id, e
                        ),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("Telemetry publisher {} shutting down", self.id);
                    break;
                }
            }
        }

        Ok(())
    }
}
