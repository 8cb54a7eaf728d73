pub mod dispatcher;

pub use dispatcher::CommandDispatcher;

use crate::telemetry::epoch_now;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

lazy_static! {
    /// The closed set of controllable devices. Commands addressed to
    /// anything else are rejected.
    pub static ref KNOWN_DEVICES: HashSet<&'static str> =
        ["fan", "light", "ac", "washing-machine"].into_iter().collect();
}

/// Outcome of routing one control command through the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutcome {
    Accepted,
    UnknownDevice,
}

/// In-memory device-name -> last-commanded-state map. Single writer: only
/// the dispatcher's message handler mutates it. All devices start "off"
/// and the map lives for the process lifetime.
#[derive(Clone, Debug)]
pub struct DeviceRegistry {
    states: BTreeMap<String, String>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let states = KNOWN_DEVICES
            .iter()
            .map(|d| (d.to_string(), "off".to_string()))
            .collect();
        Self { states }
    }

    /// Stores the command payload verbatim for a known device. The payload
    /// vocabulary is deliberately unvalidated; arbitrary state strings are
    /// accepted to match the deployed behavior.
    pub fn apply(&mut self, device: &str, state: &str) -> CommandOutcome {
        if !KNOWN_DEVICES.contains(device) {
            return CommandOutcome::UnknownDevice;
        }
        self.states.insert(device.to_string(), state.to_string());
        CommandOutcome::Accepted
    }

    pub fn get(&self, device: &str) -> Option<&str> {
        self.states.get(device).map(String::as_str)
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.states.clone()
    }
}

/// Payload for `esp/status`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub timestamp: f64,
    pub devices: BTreeMap<String, String>,
    pub system: String,
}

impl DeviceStatus {
    pub fn new(devices: BTreeMap<String, String>) -> Self {
        Self {
            timestamp: epoch_now(),
            devices,
            system: "esp32_simulator".to_string(),
        }
    }
}
