use serde::{Deserialize, Serialize};

/// Number of tracked nodes carried by every telemetry frame
pub const NODE_COUNT: usize = 6;

/// Position component of a node pose (normalized, firmware units)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Orientation of a node, stored x, y, z, w
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// Components in the order consumers expect: w, x, y, z
    pub fn wxyz(&self) -> [f32; 4] {
        [self.w, self.x, self.y, self.z]
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// One (position, orientation) pair for a tracked node
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePose {
    pub position: Vector3,
    pub orientation: Quaternion,
}

/// One decoded telemetry frame.
///
/// The node index is positional: index `i` is the anatomical node the
/// firmware assigns to slot `i`, it is not carried in the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub device_name: String,
    pub timestamp: u32,
    pub nodes: [NodePose; NODE_COUNT],
}

impl TelemetrySample {
    pub fn pose(&self, node: usize) -> Option<&NodePose> {
        self.nodes.get(node)
    }

    pub fn poses(&self) -> impl Iterator<Item = &NodePose> {
        self.nodes.iter()
    }
}

/// A radio advertisement observed while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub name: String,
    pub address: u64,
    pub signal_strength: i16,
}

impl Advertisement {
    pub fn new(name: impl Into<String>, address: u64) -> Self {
        Self {
            name: name.into(),
            address,
            signal_strength: 0,
        }
    }
}

/// Progress of one device session.
///
/// `Discovered` is never stored. It is what the registry reports for a
/// name without a session; an admitted name starts at `Connecting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Discovered,
    Connecting,
    ServiceBound,
    Active,
    Disconnected,
}

/// Events published to the application
#[derive(Debug, Clone)]
pub enum GloveEvent {
    /// Only published when reporting of all advertisements is enabled
    DeviceDiscovered(Advertisement),
    DeviceConnected(String),
    DeviceDisconnected(String),
    DataReceived(TelemetrySample),
}
