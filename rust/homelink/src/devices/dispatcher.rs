use super::{CommandOutcome, DeviceRegistry, DeviceStatus};
use crate::error::{HomelinkError, Result};
use crate::telemetry::SensorReading;
use crate::topics;
use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use zenoh::prelude::r#async::*;

/// Owner of the [`DeviceRegistry`]. Routes `home/control/<device>` commands
/// into the registry and answers each accepted command with a status
/// snapshot on `esp/status` followed by a fresh device-annotated reading on
/// `esp/sensors`.
pub struct CommandDispatcher {
    id: String,
    session: Arc<Session>,
    registry: Arc<Mutex<DeviceRegistry>>,
}

impl CommandDispatcher {
    pub fn new(id: String, session: Arc<Session>) -> Self {
        Self {
            id,
            session,
            registry: Arc::new(Mutex::new(DeviceRegistry::new())),
        }
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let subscriber = self
            .session
            .declare_subscriber(topics::DEVICE_CONTROL_WILDCARD)
            .res()
            .await
            .map_err(HomelinkError::ZenohError)?;

        info!(
            "Dispatcher {} subscribed to {}",
            self.id,
            topics::DEVICE_CONTROL_WILDCARD
        );

        // Announce the initial all-off snapshot.
        self.publish_device_status().await;

        while !cancel.is_cancelled() {
            tokio::select! {
                Ok(sample) = subscriber.recv_async() => {
                    let key_expr = sample.key_expr.as_str().to_string();
                    match std::str::from_utf8(&sample.value.payload.contiguous()) {
                        Ok(payload) => self.handle_command(&key_expr, payload.trim()).await,
                        Err(e) => warn!(
                            "Dispatcher {} dropped non-UTF8 command on {}: {}",
                            self.id, key_expr, e
                        ),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("Dispatcher {} shutting down", self.id);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Routes one command. Up to two best-effort publishes follow an
    /// accepted command; publish failures are logged, never retried.
    pub async fn handle_command(&self, key_expr: &str, state: &str) {
        let Some(device) = topics::device_from_key(key_expr) else {
            warn!("Dispatcher {} received command with no device segment: {}", self.id, key_expr);
            return;
        };

        let outcome = {
            let mut registry = self.registry.lock().await;
            registry.apply(device, state)
        };

        match outcome {
            CommandOutcome::Accepted => {
                info!("Dispatcher {} set device {} to: {}", self.id, device, state);
                self.publish_device_status().await;
                self.publish_sensor_reading().await;
            }
            CommandOutcome::UnknownDevice => {
                warn!("Dispatcher {} ignoring unknown device: {}", self.id, device);
            }
        }
    }

    pub async fn device_states(&self) -> BTreeMap<String, String> {
        self.registry.lock().await.snapshot()
    }

    async fn publish_device_status(&self) {
        let status = DeviceStatus::new(self.device_states().await);
        match serde_json::to_string(&status) {
            Ok(payload) => {
                if let Err(e) = self
                    .session
                    .put(topics::DEVICE_STATUS, payload)
                    .res()
                    .await
                {
                    warn!("Dispatcher {} failed to publish status: {}", self.id, e);
                }
            }
            Err(e) => warn!("Dispatcher {} failed to encode status: {}", self.id, e),
        }
    }

    async fn publish_sensor_reading(&self) {
        let reading = SensorReading::synthesize().with_devices(self.device_states().await);
        match serde_json::to_string(&reading) {
            Ok(payload) => {
                if let Err(e) = self.session.put(topics::SENSORS, payload).res().await {
                    warn!("Dispatcher {} failed to publish reading: {}", self.id, e);
                }
            }
            Err(e) => warn!("Dispatcher {} failed to encode reading: {}", self.id, e),
        }
    }
}
