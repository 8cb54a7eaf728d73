use super::camera::{Camera, Frame};
use super::detect::FaceDetector;
use super::recognize::KnownFaces;
use super::{
    CaptureConfig, CaptureMode, CaptureOutcome, CaptureResult, CoordinatorStatus, DetectionStatus,
    RemoteCommand, StatusReport, TriggerReason,
};
use crate::error::{HomelinkError, Result};
use crate::telemetry::SensorReading;
use crate::topics;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use zenoh::prelude::r#async::*;

/// Delay between frame grabs in the timeout-bounded capture loop.
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// Motion-triggered capture coordinator.
///
/// Two states, READY and PROCESSING, held as an atomically-checked busy
/// flag so the single-capture invariant survives concurrent handler
/// dispatch. A trigger that loses the compare-and-swap is dropped with a
/// log line. The PROCESSING window covers exactly one capture attempt and
/// every exit path returns to READY.
pub struct CaptureCoordinator {
    id: String,
    session: Arc<Session>,
    config: Arc<Mutex<CaptureConfig>>,
    busy: Arc<AtomicBool>,
    camera: Arc<Mutex<Box<dyn Camera>>>,
    detector: Arc<dyn FaceDetector>,
    known_faces: Option<Arc<KnownFaces>>,
    output_dir: PathBuf,
}

impl CaptureCoordinator {
    pub fn new(
        id: String,
        session: Arc<Session>,
        camera: Box<dyn Camera>,
        detector: Arc<dyn FaceDetector>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            id,
            session,
            config: Arc::new(Mutex::new(CaptureConfig::default())),
            busy: Arc::new(AtomicBool::new(false)),
            camera: Arc::new(Mutex::new(camera)),
            detector,
            known_faces: None,
            output_dir,
        }
    }

    pub fn with_config(self, config: CaptureConfig) -> Self {
        Self {
            config: Arc::new(Mutex::new(config)),
            ..self
        }
    }

    /// Switches the analysis step to the recognition variant.
    pub fn with_known_faces(mut self, known_faces: KnownFaces) -> Self {
        self.known_faces = Some(Arc::new(known_faces));
        self
    }

    pub async fn get_config(&self) -> CaptureConfig {
        *self.config.lock().await
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let sensor_subscriber = self
            .session
            .declare_subscriber(topics::SENSORS)
            .res()
            .await
            .map_err(HomelinkError::ZenohError)?;

        let command_subscriber = self
            .session
            .declare_subscriber(topics::CAPTURE_COMMANDS)
            .res()
            .await
            .map_err(HomelinkError::ZenohError)?;

        info!(
            "Coordinator {} subscribed to {} and {}",
            self.id,
            topics::SENSORS,
            topics::CAPTURE_COMMANDS
        );

        self.publish_status().await;

        // The capture operation runs inline and can block this loop for up
        // to the configured timeout; at most one capture is ever in flight.
        while !cancel.is_cancelled() {
            tokio::select! {
                Ok(sample) = sensor_subscriber.recv_async() => {
                    match std::str::from_utf8(&sample.value.payload.contiguous()) {
                        Ok(payload) => match serde_json::from_str::<SensorReading>(payload) {
                            Ok(reading) => self.handle_sensor_reading(reading).await,
                            Err(e) => warn!(
                                "Coordinator {} dropped malformed reading: {}",
                                self.id, e
                            ),
                        },
                        Err(e) => warn!(
                            "Coordinator {} dropped non-UTF8 reading: {}",
                            self.id, e
                        ),
                    }
                }
                Ok(sample) = command_subscriber.recv_async() => {
                    match std::str::from_utf8(&sample.value.payload.contiguous()) {
                        Ok(payload) => match serde_json::from_str::<RemoteCommand>(payload) {
                            Ok(command) => self.handle_command(command).await,
                            Err(e) => warn!(
                                "Coordinator {} dropped unrecognized command: {}",
                                self.id, e
                            ),
                        },
                        Err(e) => warn!(
                            "Coordinator {} dropped non-UTF8 command: {}",
                            self.id, e
                        ),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("Coordinator {} shutting down", self.id);
                    break;
                }
            }
        }

        Ok(())
    }

    pub async fn handle_sensor_reading(&self, reading: SensorReading) {
        if !reading.motion_detected() {
            debug!("Coordinator {} reading without motion, ignoring", self.id);
            return;
        }
        info!(
            "Coordinator {} motion detected (pir={} ir={}), starting capture",
            self.id, reading.pir, reading.ir
        );
        self.trigger(
            TriggerReason::MotionDetection,
            Some((reading.pir, reading.ir)),
            None,
        )
        .await;
    }

    pub async fn handle_command(&self, command: RemoteCommand) {
        match command {
            RemoteCommand::TriggerCamera { reason, priority } => {
                info!(
                    "Coordinator {} camera trigger from server (priority: {})",
                    self.id,
                    priority.as_deref().unwrap_or("normal")
                );
                self.trigger(
                    reason.unwrap_or(TriggerReason::ServerCommand),
                    None,
                    priority,
                )
                .await;
            }
            RemoteCommand::Configure {
                timeout,
                sensitivity,
                mode,
            } => {
                let updated = {
                    let mut config = self.config.lock().await;
                    config.merge(timeout, sensitivity, mode);
                    *config
                };
                info!("Coordinator {} config updated: {:?}", self.id, updated);
                self.publish_status().await;
            }
            RemoteCommand::StatusRequest => {
                info!("Coordinator {} status requested", self.id);
                self.publish_status().await;
            }
        }
    }

    /// READY -> PROCESSING -> READY around one capture attempt. Returns
    /// false when the trigger lost the guard and was dropped.
    pub async fn trigger(
        &self,
        reason: TriggerReason,
        motion: Option<(u8, u8)>,
        priority: Option<String>,
    ) -> bool {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!(
                "Coordinator {} capture already in progress, dropping trigger ({:?})",
                self.id, reason
            );
            return false;
        }

        let config_used = {
            let mut config = self.config.lock().await;
            config.status = CoordinatorStatus::Processing;
            *config
        };
        self.publish_status().await;

        let outcome = self
            .capture_and_analyze(reason, config_used, motion, priority)
            .await;
        self.publish_outcome(&outcome).await;

        {
            let mut config = self.config.lock().await;
            config.status = CoordinatorStatus::Ready;
        }
        self.busy.store(false, Ordering::SeqCst);
        self.publish_status().await;

        true
    }

    async fn capture_and_analyze(
        &self,
        reason: TriggerReason,
        config: CaptureConfig,
        motion: Option<(u8, u8)>,
        priority: Option<String>,
    ) -> CaptureOutcome {
        let mut camera = self.camera.lock().await;

        if let Err(e) = camera.open().await {
            warn!("Coordinator {} camera not accessible: {}", self.id, e);
            camera.release().await;
            return CaptureOutcome::Failed {
                error: e.to_string(),
                reason,
            };
        }

        let frame = self.frame_loop(&mut camera, config).await;
        // The camera is released before analysis, on every path.
        camera.release().await;
        drop(camera);

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Coordinator {} failed to capture a frame: {}", self.id, e);
                return CaptureOutcome::Failed {
                    error: e.to_string(),
                    reason,
                };
            }
        };

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let image_path = self.output_dir.join(format!("capture_{}.pgm", timestamp));
        if let Err(e) = frame.save(&image_path).await {
            warn!(
                "Coordinator {} failed to persist frame to {}: {}",
                self.id,
                image_path.display(),
                e
            );
        } else {
            info!(
                "Coordinator {} frame saved to {}",
                self.id,
                image_path.display()
            );
        }

        let encodings = match self.detector.detect(&frame, config.sensitivity) {
            Ok(encodings) => encodings,
            Err(e) => {
                warn!("Coordinator {} detection failed: {}", self.id, e);
                return CaptureOutcome::Failed {
                    error: e.to_string(),
                    reason,
                };
            }
        };

        let face_detected = !encodings.is_empty();
        let message = match &self.known_faces {
            Some(known) => known.identify(&encodings),
            None if face_detected => format!("Found {} face(s)", encodings.len()),
            None => "No faces detected".to_string(),
        };
        info!("Coordinator {} analysis result: {}", self.id, message);

        CaptureOutcome::Completed(CaptureResult {
            timestamp,
            face_detected,
            message,
            image_path: image_path.display().to_string(),
            status: if face_detected {
                DetectionStatus::FaceDetected
            } else {
                DetectionStatus::NoFace
            },
            reason,
            config_used: config,
            pir: motion.map(|(pir, _)| pir),
            ir: motion.map(|(_, ir)| ir),
            priority,
        })
    }

    /// Grabs frames until the wall-clock timeout, keeping the last one.
    /// Manual mode is the headless capture escape: one immediate grab.
    async fn frame_loop(
        &self,
        camera: &mut Box<dyn Camera>,
        config: CaptureConfig,
    ) -> Result<Frame> {
        let mut frame = camera.read_frame().await?;
        if config.mode == CaptureMode::Manual {
            info!("Coordinator {} manual capture", self.id);
            return Ok(frame);
        }

        // `merge` already clamps wire-supplied timeouts; the min here also
        // covers configs handed straight to `with_config`.
        let deadline =
            Instant::now() + Duration::from_secs(config.timeout.min(super::MAX_TIMEOUT_SECS));
        while Instant::now() < deadline {
            tokio::time::sleep(FRAME_INTERVAL).await;
            match camera.read_frame().await {
                Ok(next) => frame = next,
                Err(e) => {
                    warn!(
                        "Coordinator {} frame grab failed, keeping last frame: {}",
                        self.id, e
                    );
                    break;
                }
            }
        }
        Ok(frame)
    }

    pub async fn publish_status(&self) {
        let report = StatusReport::new(self.get_config().await);
        match serde_json::to_string(&report) {
            Ok(payload) => {
                if let Err(e) = self.session.put(topics::CAPTURE_STATUS, payload).res().await {
                    warn!("Coordinator {} failed to publish status: {}", self.id, e);
                }
            }
            Err(e) => warn!("Coordinator {} failed to encode status: {}", self.id, e),
        }
    }

    async fn publish_outcome(&self, outcome: &CaptureOutcome) {
        match serde_json::to_string(outcome) {
            Ok(payload) => {
                if let Err(e) = self
                    .session
                    .put(topics::CAPTURE_RESULTS, payload)
                    .res()
                    .await
                {
                    warn!("Coordinator {} failed to publish result: {}", self.id, e);
                }
            }
            Err(e) => warn!("Coordinator {} failed to encode result: {}", self.id, e),
        }
    }
}
