//! Live telemetry from HMI motion-tracking gloves over Bluetooth LE.

pub mod domain;
pub mod infrastructure;
