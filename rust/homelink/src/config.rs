use crate::capture::{CaptureConfig, CaptureMode, CoordinatorStatus, Sensitivity, MAX_TIMEOUT_SECS};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// On-disk node settings. Every field has a default, so an empty file (or
/// no file at all, via [`Settings::default`]) is a valid configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// Zenoh endpoint to connect to; peer-to-peer discovery when absent.
    #[serde(default)]
    pub zenoh_peer: Option<String>,
    #[serde(default = "default_publish_interval")]
    pub publish_interval_secs: u64,
    #[serde(default)]
    pub capture: CaptureSettings,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaptureSettings {
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_sensitivity")]
    pub sensitivity: Sensitivity,
    #[serde(default = "default_mode")]
    pub mode: CaptureMode,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// JSON known-face store; detection-only when absent.
    #[serde(default)]
    pub encodings_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            zenoh_peer: None,
            publish_interval_secs: default_publish_interval(),
            capture: CaptureSettings::default(),
        }
    }
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            sensitivity: default_sensitivity(),
            mode: default_mode(),
            output_dir: default_output_dir(),
            encodings_path: None,
        }
    }
}

impl CaptureSettings {
    pub fn to_capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            timeout: self.timeout.min(MAX_TIMEOUT_SECS),
            sensitivity: self.sensitivity,
            mode: self.mode,
            status: CoordinatorStatus::Ready,
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&contents)?;
        Ok(settings)
    }
}

fn default_publish_interval() -> u64 {
    2
}

fn default_timeout() -> u64 {
    10
}

fn default_sensitivity() -> Sensitivity {
    Sensitivity::Medium
}

fn default_mode() -> CaptureMode {
    CaptureMode::Auto
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("captured_faces")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_settings() {
        let contents = r#"
        zenoh_peer: "tcp/localhost:7447"
        publish_interval_secs: 5
        capture:
          timeout: 30
          sensitivity: high
          mode: manual
          output_dir: /tmp/frames
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", contents).unwrap();

        let settings = Settings::load(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.zenoh_peer.as_deref(), Some("tcp/localhost:7447"));
        assert_eq!(settings.publish_interval_secs, 5);
        assert_eq!(settings.capture.timeout, 30);
        assert_eq!(settings.capture.sensitivity, Sensitivity::High);
        assert_eq!(settings.capture.mode, CaptureMode::Manual);
        assert_eq!(settings.capture.output_dir, PathBuf::from("/tmp/frames"));
        assert!(settings.capture.encodings_path.is_none());
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "capture:\n  timeout: 3\n").unwrap();

        let settings = Settings::load(temp_file.path().to_str().unwrap()).unwrap();
        assert!(settings.zenoh_peer.is_none());
        assert_eq!(settings.publish_interval_secs, 2);
        assert_eq!(settings.capture.timeout, 3);
        assert_eq!(settings.capture.sensitivity, Sensitivity::Medium);

        let config = settings.capture.to_capture_config();
        assert_eq!(config.timeout, 3);
        assert_eq!(config.status, CoordinatorStatus::Ready);
    }

    #[test]
    fn test_oversized_timeout_is_clamped() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "capture:\n  timeout: 18446744073709551615\n").unwrap();

        let settings = Settings::load(temp_file.path().to_str().unwrap()).unwrap();
        let config = settings.capture.to_capture_config();
        assert_eq!(config.timeout, MAX_TIMEOUT_SECS);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Settings::load("/nonexistent/homelink.yaml").is_err());
    }
}
