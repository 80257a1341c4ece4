//! HMI Glove Protocol
//!
//! Wire constants for the glove peripheral and the decoder for its
//! telemetry notification frame.

use crate::domain::errors::FrameError;
use crate::domain::models::{NodePose, Quaternion, TelemetrySample, Vector3, NODE_COUNT};
use uuid::Uuid;

/// Advertised name of the right-hand glove
pub const DEVICE_NAME: &str = "HMI Glove R";

/// Telemetry GATT service
pub const TELEMETRY_SERVICE_UUID: Uuid = Uuid::from_u128(0x00000000_0000_1000_8000_00805f9b34fb);

/// Bytes used by the frame timestamp
pub const TIMESTAMP_LEN: usize = 4;

/// Bytes per node: seven 16-bit fields
pub const NODE_STRIDE: usize = 14;

/// Bytes consumed from every frame
pub const FRAME_LEN: usize = TIMESTAMP_LEN + NODE_COUNT * NODE_STRIDE;

/// Scale for the quaternion w field, mapped onto [0, 1]
const UNSIGNED_SCALE: f32 = 65535.0;

/// Scale for every other field, mapped onto [-1, 1)
const SIGNED_SCALE: f32 = 32767.5;

/// Read the frame timestamp without decoding the rest
pub fn frame_timestamp(bytes: &[u8]) -> Option<u32> {
    let raw = bytes.get(..TIMESTAMP_LEN)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// Decode a telemetry notification into a sample
///
/// # Frame Structure (88 bytes)
///
/// ```text
/// [0-3]   : Timestamp (u32 little-endian)
///
/// Node i (i = 0..6), base = 4 + i * 14, every field u16 little-endian:
/// [base+0..2]   : Orientation W  (v / 65535)
/// [base+2..4]   : Orientation X  (v / 32767.5 - 1)
/// [base+4..6]   : Orientation Y
/// [base+6..8]   : Orientation Z
/// [base+8..10]  : Position X     (v / 32767.5 - 1)
/// [base+10..12] : Position Y
/// [base+12..14] : Position Z
/// ```
///
/// W uses the unsigned range because the firmware only sends the
/// shortest-rotation quaternion, so w is never negative. Positions are
/// normalized, not metric. Bytes past the 88th are ignored.
pub fn decode(name: &str, bytes: &[u8]) -> Result<TelemetrySample, FrameError> {
    if bytes.len() < FRAME_LEN {
        return Err(FrameError::MalformedFrame {
            len: bytes.len(),
            expected: FRAME_LEN,
        });
    }

    let timestamp = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

    let mut nodes = [NodePose::default(); NODE_COUNT];
    for (i, node) in nodes.iter_mut().enumerate() {
        let base = TIMESTAMP_LEN + i * NODE_STRIDE;
        let field = |n: usize| read_u16(bytes, base + n * 2);

        node.orientation = Quaternion::new(
            signed(field(1)),
            signed(field(2)),
            signed(field(3)),
            field(0) as f32 / UNSIGNED_SCALE,
        );
        node.position = Vector3::new(signed(field(4)), signed(field(5)), signed(field(6)));
    }

    Ok(TelemetrySample {
        device_name: name.to_string(),
        timestamp,
        nodes,
    })
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn signed(raw: u16) -> f32 {
    raw as f32 / SIGNED_SCALE - 1.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a frame with every node carrying the same seven raw fields
    pub(crate) fn uniform_frame(timestamp: u32, fields: [u16; 7]) -> Vec<u8> {
        let mut frame = timestamp.to_le_bytes().to_vec();
        for _ in 0..NODE_COUNT {
            for value in fields {
                frame.extend_from_slice(&value.to_le_bytes());
            }
        }
        frame
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_frame_len() {
        assert_eq!(FRAME_LEN, 88);
    }

    #[test]
    fn test_service_uuid() {
        assert_eq!(
            TELEMETRY_SERVICE_UUID.to_string(),
            "00000000-0000-1000-8000-00805f9b34fb"
        );
    }

    #[test]
    fn test_decode_centerpoint_frame() {
        let frame = uniform_frame(100, [0xFFFF, 0x7FFF, 0x7FFF, 0x7FFF, 0x7FFF, 0x7FFF, 0x7FFF]);
        assert_eq!(frame.len(), FRAME_LEN);

        let sample = decode("HMI Glove R", &frame).unwrap();
        assert_eq!(sample.device_name, "HMI Glove R");
        assert_eq!(sample.timestamp, 100);
        assert_eq!(sample.poses().count(), NODE_COUNT);

        for node in sample.poses() {
            assert_eq!(node.orientation.w, 1.0);
            assert!(approx(node.orientation.x, 0.0));
            assert!(approx(node.orientation.y, 0.0));
            assert!(approx(node.orientation.z, 0.0));
            assert!(approx(node.position.x, 0.0));
            assert!(approx(node.position.y, 0.0));
            assert!(approx(node.position.z, 0.0));
            assert!(node.orientation.x < 0.0);
        }
    }

    #[test]
    fn test_decode_range_endpoints() {
        let frame = uniform_frame(7, [0x0000, 0x0000, 0xFFFF, 0x0000, 0xFFFF, 0x0000, 0xFFFF]);
        let sample = decode("glove", &frame).unwrap();
        let node = sample.pose(0).unwrap();

        assert_eq!(node.orientation.w, 0.0);
        assert_eq!(node.orientation.x, -1.0);
        assert!(approx(node.orientation.y, 1.0));
        assert_eq!(node.orientation.z, -1.0);
        assert!(approx(node.position.x, 1.0));
        assert_eq!(node.position.y, -1.0);
        assert!(approx(node.position.z, 1.0));
    }

    #[test]
    fn test_decode_node_offsets() {
        let mut frame = vec![0u8; FRAME_LEN];
        frame[..4].copy_from_slice(&0x0102_0304u32.to_le_bytes());
        // Node 3 orientation W and position Z only
        let base = TIMESTAMP_LEN + 3 * NODE_STRIDE;
        frame[base..base + 2].copy_from_slice(&0xFFFFu16.to_le_bytes());
        frame[base + 12..base + 14].copy_from_slice(&0xFFFFu16.to_le_bytes());

        let sample = decode("glove", &frame).unwrap();
        assert_eq!(sample.timestamp, 0x0102_0304);

        for (i, node) in sample.poses().enumerate() {
            if i == 3 {
                assert_eq!(node.orientation.w, 1.0);
                assert!(approx(node.position.z, 1.0));
            } else {
                assert_eq!(node.orientation.w, 0.0);
                assert_eq!(node.position.z, -1.0);
            }
            assert_eq!(node.position.x, -1.0);
        }
    }

    #[test]
    fn test_decode_is_deterministic() {
        let frame: Vec<u8> = (0..FRAME_LEN as u32).map(|i| (i * 37 % 251) as u8).collect();
        let first = decode("glove", &frame).unwrap();
        let second = decode("glove", &frame).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_short_frame_is_malformed() {
        let frame = vec![0u8; 80];
        assert_eq!(
            decode("glove", &frame),
            Err(FrameError::MalformedFrame {
                len: 80,
                expected: FRAME_LEN
            })
        );
    }

    #[test]
    fn test_long_frame_uses_first_88_bytes() {
        let mut frame = uniform_frame(5, [0xFFFF, 0x7FFF, 0x7FFF, 0x7FFF, 0x7FFF, 0x7FFF, 0x7FFF]);
        let expected = decode("glove", &frame).unwrap();
        frame.extend_from_slice(&[0xAA; 12]);
        assert_eq!(decode("glove", &frame).unwrap(), expected);
    }

    #[test]
    fn test_frame_timestamp() {
        assert_eq!(frame_timestamp(&[0x64, 0, 0, 0, 9]), Some(100));
        assert_eq!(frame_timestamp(&[1, 2, 3]), None);
    }

    #[test]
    fn test_wxyz_order() {
        let frame = uniform_frame(1, [0xFFFF, 0x0000, 0x7FFF, 0xFFFF, 0, 0, 0]);
        let sample = decode("glove", &frame).unwrap();
        let [w, x, _, z] = sample.pose(5).unwrap().orientation.wxyz();
        assert_eq!(w, 1.0);
        assert_eq!(x, -1.0);
        assert!(approx(z, 1.0));
    }
}
