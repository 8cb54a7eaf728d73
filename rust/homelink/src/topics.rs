//! Fixed topic contract shared by every process. Topic strings are
//! case-sensitive literals; no component talks to another except through
//! these keys.

/// Sensor readings, published by the telemetry simulator and re-published
/// by the device node after each accepted command.
pub const SENSORS: &str = "esp/sensors";

/// Device-state snapshots from the device node.
pub const DEVICE_STATUS: &str = "esp/status";

/// Prefix for inbound device commands; the trailing segment names the device.
pub const DEVICE_CONTROL_PREFIX: &str = "home/control";

/// Single-level wildcard subscription covering all device commands.
pub const DEVICE_CONTROL_WILDCARD: &str = "home/control/*";

/// Capture results from the coordinator.
pub const CAPTURE_RESULTS: &str = "esp/cam";

/// Remote commands addressed to the coordinator.
pub const CAPTURE_COMMANDS: &str = "face-detection/commands";

/// Coordinator status reports.
pub const CAPTURE_STATUS: &str = "face-detection/status";

/// Extracts the device name from a control-topic key expression
/// (`home/control/fan` -> `fan`).
pub fn device_from_key(key_expr: &str) -> Option<&str> {
    key_expr.rsplit('/').next().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_from_key() {
        assert_eq!(device_from_key("home/control/fan"), Some("fan"));
        assert_eq!(
            device_from_key("home/control/washing-machine"),
            Some("washing-machine")
        );
        assert_eq!(device_from_key("home/control/"), None);
    }
}
