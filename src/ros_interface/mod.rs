//! ROS 2 message bridge
//!
//! Conversions between the tracker's value types and `r2r` messages, so a
//! node can feed `/scan` and `/tf` into the core and publish `/cmd_vel` and
//! `/visualization_marker` without touching the control logic:
//! - `sensor_msgs/LaserScan` into [`RangeScan`]
//! - [`VelocityCommand`] to and from `geometry_msgs/Twist`
//! - [`Marker`] into `visualization_msgs/Marker`
//! - `tf2_msgs/TFMessage` into a [`TransformBuffer`]

use log::{debug, warn};
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use r2r::builtin_interfaces::msg::{Duration as DurationMsg, Time};
use r2r::geometry_msgs::msg::{
    Point, Pose as PoseMsg, Quaternion as QuaternionMsg, TransformStamped, Twist,
    Vector3 as Vector3Msg,
};
use r2r::sensor_msgs::msg::LaserScan;
use r2r::std_msgs::msg::{ColorRGBA, Header};
use r2r::tf2_msgs::msg::TFMessage;
use r2r::visualization_msgs::msg::Marker as MarkerMsg;

use crate::core::{RangeScan, ScanHeader};
use crate::navigation::VelocityCommand;
use crate::transform::{StampedTransform, TransformBuffer, TransformError};
use crate::visualization::{Marker, MarkerAction, MarkerShape};

// visualization_msgs/Marker constants
const MARKER_SPHERE: i32 = 2;
const MARKER_ADD: i32 = 0;

// tolerated deviation of a quaternion's squared norm from one
const QUATERNION_TOLERANCE: f64 = 1e-5;

/// Seconds since the epoch of a ROS time stamp
pub fn stamp_to_secs(stamp: &Time) -> f64 {
    f64::from(stamp.sec) + f64::from(stamp.nanosec) * 1e-9
}

/// ROS time stamp for a time in seconds
pub fn secs_to_stamp(secs: f64) -> Time {
    let whole = secs.floor();
    let nanosec = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
    Time {
        sec: whole as i32,
        nanosec,
    }
}

fn lifetime_msg(secs: f64) -> DurationMsg {
    let stamp = secs_to_stamp(secs.max(0.0));
    DurationMsg {
        sec: stamp.sec,
        nanosec: stamp.nanosec,
    }
}

impl From<&LaserScan> for RangeScan {
    fn from(msg: &LaserScan) -> Self {
        let stamp = &msg.header.stamp;
        RangeScan {
            header: ScanHeader {
                frame_id: msg.header.frame_id.clone(),
                // an all-zero stamp means the driver did not set one
                stamp: (stamp.sec != 0 || stamp.nanosec != 0).then(|| stamp_to_secs(stamp)),
            },
            angle_min: msg.angle_min,
            angle_max: msg.angle_max,
            angle_increment: msg.angle_increment,
            time_increment: msg.time_increment,
            scan_time: msg.scan_time,
            range_min: msg.range_min,
            range_max: msg.range_max,
            ranges: msg.ranges.clone(),
            intensities: msg.intensities.clone(),
        }
    }
}

impl From<&VelocityCommand> for Twist {
    fn from(command: &VelocityCommand) -> Self {
        Twist {
            linear: Vector3Msg {
                x: command.linear.x,
                y: command.linear.y,
                z: command.linear.z,
            },
            angular: Vector3Msg {
                x: 0.0,
                y: 0.0,
                z: command.angular,
            },
        }
    }
}

impl From<&Twist> for VelocityCommand {
    fn from(twist: &Twist) -> Self {
        VelocityCommand {
            linear: Vector3::new(twist.linear.x, twist.linear.y, twist.linear.z),
            angular: twist.angular.z,
        }
    }
}

impl From<&Marker> for MarkerMsg {
    fn from(marker: &Marker) -> Self {
        let type_ = match marker.shape {
            MarkerShape::Sphere => MARKER_SPHERE,
        };
        let action = match marker.action {
            MarkerAction::AddOrModify => MARKER_ADD,
        };
        MarkerMsg {
            header: Header {
                stamp: Time { sec: 0, nanosec: 0 },
                frame_id: marker.frame_id.clone(),
            },
            ns: marker.namespace.clone(),
            id: marker.id,
            type_,
            action,
            pose: PoseMsg {
                position: Point {
                    x: marker.position.x,
                    y: marker.position.y,
                    z: marker.position.z,
                },
                orientation: QuaternionMsg {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    w: 1.0,
                },
            },
            scale: Vector3Msg {
                x: marker.scale[0],
                y: marker.scale[1],
                z: marker.scale[2],
            },
            color: ColorRGBA {
                r: marker.color.r,
                g: marker.color.g,
                b: marker.color.b,
                a: marker.color.a,
            },
            lifetime: lifetime_msg(marker.lifetime_secs),
            ..Default::default()
        }
    }
}

impl TryFrom<&TransformStamped> for StampedTransform {
    type Error = TransformError;

    /// Refuses rotations that are not unit quaternions, the same check tf2
    /// applies before storing a transform.
    fn try_from(msg: &TransformStamped) -> Result<Self, Self::Error> {
        let translation = &msg.transform.translation;
        let rotation = &msg.transform.rotation;
        let quaternion = Quaternion::new(rotation.w, rotation.x, rotation.y, rotation.z);
        if !((quaternion.norm_squared() - 1.0).abs() <= QUATERNION_TOLERANCE) {
            return Err(TransformError::InvalidRotation(msg.child_frame_id.clone()));
        }

        Ok(StampedTransform::new(
            msg.header.frame_id.clone(),
            msg.child_frame_id.clone(),
            stamp_to_secs(&msg.header.stamp),
            Isometry3::from_parts(
                Translation3::new(translation.x, translation.y, translation.z),
                UnitQuaternion::from_quaternion(quaternion),
            ),
        ))
    }
}

/// Stores every valid transform of a `/tf` or `/tf_static` message.
///
/// Transforms with a malformed rotation or stamp are skipped with a warning;
/// only a busy cache aborts ingestion. Returns the number of transforms stored.
pub fn ingest_tf_message(
    buffer: &TransformBuffer,
    msg: &TFMessage,
    is_static: bool,
) -> Result<usize, TransformError> {
    let mut stored = 0;
    for transform in &msg.transforms {
        let result = StampedTransform::try_from(transform).and_then(|transform| {
            if is_static {
                buffer.set_static_transform(transform)
            } else {
                buffer.set_transform(transform)
            }
        });
        match result {
            Ok(()) => stored += 1,
            Err(err @ TransformError::Timeout(_)) => return Err(err),
            Err(err) => warn!(
                "Skipping transform '{}' -> '{}': {}",
                transform.header.frame_id, transform.child_frame_id, err
            ),
        }
    }
    debug!(
        "Stored {} of {} {} transforms",
        stored,
        msg.transforms.len(),
        if is_static { "static" } else { "dynamic" }
    );
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TransformLookup;
    use crate::visualization::{Color, create_marker};
    use r2r::geometry_msgs::msg::Transform;

    #[test]
    fn stamp_conversion_round_trips() {
        let stamp = secs_to_stamp(12.25);
        assert_eq!(stamp.sec, 12);
        assert_eq!(stamp.nanosec, 250_000_000);
        assert!((stamp_to_secs(&stamp) - 12.25).abs() < 1e-9);
    }

    #[test]
    fn laser_scan_fields_are_copied() {
        let msg = LaserScan {
            header: Header {
                stamp: Time { sec: 3, nanosec: 500_000_000 },
                frame_id: "base_laser".to_string(),
            },
            angle_min: -1.0,
            angle_max: 1.0,
            angle_increment: 1.0,
            range_min: 0.1,
            range_max: 30.0,
            ranges: vec![1.0, 2.0, 3.0],
            ..Default::default()
        };
        let scan = RangeScan::from(&msg);
        assert_eq!(scan.header.frame_id, "base_laser");
        assert_eq!(scan.header.stamp, Some(3.5));
        assert_eq!(scan.ranges, vec![1.0, 2.0, 3.0]);
        assert!(scan.validate().is_ok());
    }

    #[test]
    fn twist_carries_yaw_rate() {
        let command = VelocityCommand {
            linear: Vector3::new(0.5, 0.0, 0.0),
            angular: -0.4,
        };
        let twist = Twist::from(&command);
        assert_eq!(twist.linear.x, 0.5);
        assert_eq!(twist.angular.z, -0.4);
        assert_eq!(VelocityCommand::from(&twist), command);
    }

    #[test]
    fn marker_message_uses_sphere_add() {
        let marker = create_marker(1.0, 2.0, "odom", 4, Color::new(0.0, 0.0, 1.0, 1.0));
        let msg = MarkerMsg::from(&marker);
        assert_eq!(msg.header.frame_id, "odom");
        assert_eq!(msg.id, 4);
        assert_eq!(msg.type_, MARKER_SPHERE);
        assert_eq!(msg.action, MARKER_ADD);
        assert_eq!(msg.pose.position.y, 2.0);
    }

    fn tf_msg(child: &str, x: f64, rotation: QuaternionMsg) -> TransformStamped {
        TransformStamped {
            header: Header {
                stamp: Time { sec: 1, nanosec: 0 },
                frame_id: "odom".to_string(),
            },
            child_frame_id: child.to_string(),
            transform: Transform {
                translation: Vector3Msg { x, y: 0.0, z: 0.0 },
                rotation,
            },
        }
    }

    fn unit_rotation() -> QuaternionMsg {
        QuaternionMsg { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }

    #[test]
    fn tf_message_feeds_buffer() {
        let msg = TFMessage {
            transforms: vec![tf_msg("base_link", 2.0, unit_rotation())],
        };
        let buffer = TransformBuffer::default();
        assert_eq!(ingest_tf_message(&buffer, &msg, false), Ok(1));
        let transform = buffer.lookup_transform("odom", "base_link", Some(1.0)).unwrap();
        assert!((transform.isometry.translation.x - 2.0).abs() < 1e-9);
    }

    #[test]
    fn zero_quaternion_is_refused() {
        let msg = tf_msg("base_link", 1.0, QuaternionMsg::default());
        assert_eq!(
            StampedTransform::try_from(&msg),
            Err(TransformError::InvalidRotation("base_link".to_string()))
        );
    }

    #[test]
    fn malformed_transforms_are_skipped() {
        let msg = TFMessage {
            transforms: vec![
                tf_msg("base_link", 2.0, unit_rotation()),
                tf_msg("gripper", 0.5, QuaternionMsg::default()),
                tf_msg("camera", 0.1, QuaternionMsg { x: 0.0, y: 0.0, z: 0.0, w: f64::NAN }),
            ],
        };
        let buffer = TransformBuffer::default();
        assert_eq!(ingest_tf_message(&buffer, &msg, true), Ok(1));
        assert_eq!(buffer.frames(), vec!["base_link", "odom"]);
        let transform = buffer.lookup_transform("odom", "base_link", None).unwrap();
        assert!(transform.isometry.rotation.w.is_finite());
    }
}
