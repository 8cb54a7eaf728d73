pub mod publisher;

pub use publisher::TelemetryPublisher;

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Probability that a synthesized reading asserts both motion flags.
pub const MOTION_PROBABILITY: f64 = 0.1;

/// One sensor reading as it travels on `esp/sensors`.
///
/// Every field carries a serde default so that partial messages from other
/// publishers (a bare `{"pir":1,"ir":0}` is a legal trigger) still parse;
/// non-JSON or wrong-typed payloads are rejected at the boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(default)]
    pub temp: f64,
    #[serde(default)]
    pub hum: f64,
    #[serde(default)]
    pub ldr: i64,
    #[serde(default)]
    pub pir: u8,
    #[serde(default)]
    pub ir: u8,
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub devices: Option<BTreeMap<String, String>>,
}

impl SensorReading {
    /// Draws one reading from the simulator distributions: temperature
    /// centered on 25 C, humidity on 60 %, light level on 300, motion
    /// asserted on both flags together with [`MOTION_PROBABILITY`].
    pub fn synthesize() -> Self {
        let mut rng = rand::thread_rng();
        let temp = 25.0 + rng.gen_range(-2.0..3.0);
        let hum = 60.0 + rng.gen_range(-5.0..10.0);
        let ldr = 300 + rng.gen_range(-50..=50);
        let (pir, ir) = if rng.gen_bool(MOTION_PROBABILITY) {
            (1, 1)
        } else {
            (0, 0)
        };

        Self {
            temp: round1(temp),
            hum: round1(hum),
            ldr,
            pir,
            ir,
            timestamp: epoch_now(),
            devices: None,
        }
    }

    pub fn with_devices(mut self, devices: BTreeMap<String, String>) -> Self {
        self.devices = Some(devices);
        self
    }

    pub fn motion_detected(&self) -> bool {
        self.pir == 1 || self.ir == 1
    }
}

/// Hard bounds for the clamped simulator variant.
#[derive(Clone, Debug)]
pub struct ReadingBounds {
    pub temp: (f64, f64),
    pub hum: (f64, f64),
    pub ldr: (i64, i64),
}

impl Default for ReadingBounds {
    fn default() -> Self {
        Self {
            temp: (18.0, 35.0),
            hum: (30.0, 90.0),
            ldr: (50, 500),
        }
    }
}

impl ReadingBounds {
    pub fn clamp(&self, reading: &mut SensorReading) {
        reading.temp = reading.temp.clamp(self.temp.0, self.temp.1);
        reading.hum = reading.hum.clamp(self.hum.0, self.hum.1);
        reading.ldr = reading.ldr.clamp(self.ldr.0, self.ldr.1);
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn epoch_now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesized_values_within_distributions() {
        for _ in 0..200 {
            let reading = SensorReading::synthesize();
            assert!(reading.temp >= 23.0 && reading.temp <= 28.0);
            assert!(reading.hum >= 55.0 && reading.hum <= 70.0);
            assert!(reading.ldr >= 250 && reading.ldr <= 350);
            // Motion flags move together in the simulator.
            assert_eq!(reading.pir, reading.ir);
            assert!(reading.timestamp > 0.0);
        }
    }

    #[test]
    fn test_round_trip_is_finite_json() {
        let reading = SensorReading::synthesize();
        let json = serde_json::to_string(&reading).unwrap();
        let parsed: SensorReading = serde_json::from_str(&json).unwrap();
        assert!(parsed.temp.is_finite());
        assert!(parsed.hum.is_finite());
        assert_eq!(parsed, reading);
        // No device snapshot means no `devices` key on the wire.
        assert!(!json.contains("devices"));
    }

    #[test]
    fn test_minimal_motion_message_parses() {
        let reading: SensorReading = serde_json::from_str(r#"{"pir":1,"ir":0}"#).unwrap();
        assert_eq!(reading.pir, 1);
        assert_eq!(reading.ir, 0);
        assert!(reading.motion_detected());
        assert_eq!(reading.temp, 0.0);
    }

    #[test]
    fn test_non_json_payload_rejected() {
        assert!(serde_json::from_str::<SensorReading>("RESULT:Unknown").is_err());
        assert!(serde_json::from_str::<SensorReading>(r#"{"pir":"high"}"#).is_err());
    }

    #[test]
    fn test_bounds_clamp() {
        let bounds = ReadingBounds::default();
        let mut reading = SensorReading {
            temp: 40.0,
            hum: 10.0,
            ldr: 600,
            pir: 0,
            ir: 0,
            timestamp: 0.0,
            devices: None,
        };
        bounds.clamp(&mut reading);
        assert_eq!(reading.temp, 35.0);
        assert_eq!(reading.hum, 30.0);
        assert_eq!(reading.ldr, 500);
    }

    #[test]
    fn test_device_annotation() {
        let mut devices = std::collections::BTreeMap::new();
        devices.insert("fan".to_string(), "on".to_string());
        let reading = SensorReading::synthesize().with_devices(devices);
        let json = serde_json::to_string(&reading).unwrap();
        assert!(json.contains(r#""devices":{"fan":"on"}"#));
    }
}
