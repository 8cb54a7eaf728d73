pub mod camera;
pub mod coordinator;
pub mod detect;
pub mod recognize;

pub use camera::{Camera, Frame, SyntheticCamera};
pub use coordinator::CaptureCoordinator;
pub use detect::{DetectorRegistry, FaceDetector};
pub use recognize::KnownFaces;

use crate::telemetry::epoch_now;
use serde::{Deserialize, Serialize};

/// Upper bound on the configurable capture timeout. Keeps the frame-loop
/// deadline arithmetic well inside what `Instant` can represent.
pub const MAX_TIMEOUT_SECS: u64 = 3600;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Frame loop runs until the configured timeout.
    Auto,
    /// Headless manual escape: a single immediate grab.
    Manual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinatorStatus {
    Ready,
    Processing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    MotionDetection,
    ServerCommand,
    Manual,
}

/// Coordinator-owned tunables. Mutated only by validated `configure`
/// commands; `status` mirrors the READY/PROCESSING state for the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub timeout: u64,
    pub sensitivity: Sensitivity,
    pub mode: CaptureMode,
    pub status: CoordinatorStatus,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            timeout: 10,
            sensitivity: Sensitivity::Medium,
            mode: CaptureMode::Auto,
            status: CoordinatorStatus::Ready,
        }
    }
}

impl CaptureConfig {
    /// Merges a partial update; omitted fields keep their current values.
    /// The timeout must stay positive, so a zero is ignored; anything above
    /// [`MAX_TIMEOUT_SECS`] is clamped down to it.
    pub fn merge(
        &mut self,
        timeout: Option<u64>,
        sensitivity: Option<Sensitivity>,
        mode: Option<CaptureMode>,
    ) {
        if let Some(timeout) = timeout {
            if timeout > 0 {
                self.timeout = timeout.min(MAX_TIMEOUT_SECS);
            }
        }
        if let Some(sensitivity) = sensitivity {
            self.sensitivity = sensitivity;
        }
        if let Some(mode) = mode {
            self.mode = mode;
        }
    }
}

/// Commands arriving on `face-detection/commands`, dispatched strictly by
/// the `action` tag. Anything else fails the parse and is dropped.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemoteCommand {
    TriggerCamera {
        #[serde(default)]
        reason: Option<TriggerReason>,
        #[serde(default)]
        priority: Option<String>,
    },
    Configure {
        #[serde(default)]
        timeout: Option<u64>,
        #[serde(default)]
        sensitivity: Option<Sensitivity>,
        #[serde(default)]
        mode: Option<CaptureMode>,
    },
    StatusRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    FaceDetected,
    NoFace,
}

/// One completed capture attempt, published on `esp/cam` and discarded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureResult {
    pub timestamp: u64,
    pub face_detected: bool,
    pub message: String,
    pub image_path: String,
    pub status: DetectionStatus,
    pub reason: TriggerReason,
    pub config_used: CaptureConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pir: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ir: Option<u8>,
    /// Carried through from the triggering command; never affects
    /// scheduling, there is only a single in-flight capture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

/// What a capture attempt produced: a result, or a structured error in
/// place of the face fields (camera unavailable, frame grab failure).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptureOutcome {
    Completed(CaptureResult),
    Failed { error: String, reason: TriggerReason },
}

/// Payload for `face-detection/status`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusReport {
    pub timestamp: f64,
    pub status: CoordinatorStatus,
    pub config: CaptureConfig,
    pub system: String,
    pub version: String,
}

impl StatusReport {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            timestamp: epoch_now(),
            status: config.status,
            config,
            system: "face_detection".to_string(),
            version: "1.0".to_string(),
        }
    }
}
