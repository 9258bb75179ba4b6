// core/localization.rs

// Frame-tagged poses and the pose transformer. A pose is only meaningful
// together with the frame it is expressed in; moving it to another frame goes
// through the injected transform lookup, never through a global tree.

use log::debug;
use nalgebra::{Isometry3, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::transform::{TransformError, TransformLookup};

/// Position and orientation expressed in a named frame
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Frame the pose is expressed in
    pub frame_id: String,
    /// Time the pose refers to (s); `None` means "latest"
    pub stamp: Option<f64>,
    /// Position and orientation relative to `frame_id`
    pub isometry: Isometry3<f64>,
}

impl Pose {
    /// Creates a pose in `frame_id`
    pub fn new(frame_id: impl Into<String>, isometry: Isometry3<f64>) -> Self {
        Pose {
            frame_id: frame_id.into(),
            stamp: None,
            isometry,
        }
    }

    /// Pose on the ground plane with heading `yaw`
    pub fn from_planar(frame_id: impl Into<String>, x: f64, y: f64, yaw: f64) -> Self {
        Pose::new(
            frame_id,
            Isometry3::new(Vector3::new(x, y, 0.0), Vector3::new(0.0, 0.0, yaw)),
        )
    }

    /// Attaches a time to the pose
    pub fn with_stamp(mut self, stamp: Option<f64>) -> Self {
        self.stamp = stamp;
        self
    }

    /// Position of the pose origin
    pub fn position(&self) -> Point3<f64> {
        Point3::from(self.isometry.translation.vector)
    }

    /// Rotation about z (rad)
    pub fn yaw(&self) -> f64 {
        self.isometry.rotation.euler_angles().2
    }
}

/// Expresses `src_pose` in `dest_frame`.
///
/// The transform is looked up at the pose's stamp, or the latest available one
/// when the pose has none. On failure no pose is produced.
pub fn transform_pose<L>(
    lookup: &L,
    src_pose: &Pose,
    src_frame: &str,
    dest_frame: &str,
) -> Result<Pose, TransformError>
where
    L: TransformLookup + ?Sized,
{
    if src_pose.frame_id != src_frame {
        return Err(TransformError::FrameMismatch {
            expected: src_frame.to_string(),
            actual: src_pose.frame_id.clone(),
        });
    }

    let transform = lookup.lookup_transform(dest_frame, src_frame, src_pose.stamp)?;
    debug!(
        "Transformed pose from '{}' to '{}' at {:.3}s",
        src_frame, dest_frame, transform.stamp
    );

    Ok(Pose {
        frame_id: dest_frame.to_string(),
        stamp: src_pose.stamp,
        isometry: transform.isometry * src_pose.isometry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{MockTransformLookup, StampedTransform};
    use std::f64::consts::FRAC_PI_2;

    fn laser_in_base() -> Isometry3<f64> {
        Isometry3::new(Vector3::new(0.3, 0.0, 0.2), Vector3::new(0.0, 0.0, FRAC_PI_2))
    }

    #[test]
    fn applies_looked_up_transform() {
        let mut lookup = MockTransformLookup::new();
        lookup
            .expect_lookup_transform()
            .withf(|target, source, stamp| {
                target.to_string() == "base_link"
                    && source.to_string() == "base_laser"
                    && *stamp == Some(4.0)
            })
            .times(1)
            .returning(|target, source, stamp| {
                Ok(StampedTransform::new(
                    target,
                    source,
                    stamp.unwrap_or(0.0),
                    laser_in_base(),
                ))
            });

        let pose = Pose::from_planar("base_laser", 1.0, 0.0, 0.0).with_stamp(Some(4.0));
        let moved = transform_pose(&lookup, &pose, "base_laser", "base_link").unwrap();

        assert_eq!(moved.frame_id, "base_link");
        assert_eq!(moved.stamp, Some(4.0));
        let position = moved.position();
        assert!((position.x - 0.3).abs() < 1e-9);
        assert!((position.y - 1.0).abs() < 1e-9);
        assert!((position.z - 0.2).abs() < 1e-9);
        assert!((moved.yaw() - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn lookup_failure_is_propagated() {
        let mut lookup = MockTransformLookup::new();
        lookup
            .expect_lookup_transform()
            .returning(|_, _, _| Err(TransformError::UnknownFrame("odom".to_string())));

        let pose = Pose::from_planar("base_laser", 1.0, 0.0, 0.0);
        assert_eq!(
            transform_pose(&lookup, &pose, "base_laser", "odom"),
            Err(TransformError::UnknownFrame("odom".to_string()))
        );
    }

    #[test]
    fn pose_in_wrong_frame_is_rejected_without_lookup() {
        let mut lookup = MockTransformLookup::new();
        lookup.expect_lookup_transform().never();

        let pose = Pose::from_planar("camera", 1.0, 0.0, 0.0);
        assert!(matches!(
            transform_pose(&lookup, &pose, "base_laser", "base_link"),
            Err(TransformError::FrameMismatch { .. })
        ));
    }

    #[test]
    fn round_trip_restores_pose() {
        let forward = laser_in_base();
        let mut lookup = MockTransformLookup::new();
        lookup
            .expect_lookup_transform()
            .returning(move |target, source, _| {
                let isometry = if target.to_string() == "base_link" {
                    forward
                } else {
                    forward.inverse()
                };
                Ok(StampedTransform::new(target, source, 0.0, isometry))
            });

        let pose = Pose::from_planar("base_laser", 2.0, -1.0, 0.4);
        let there = transform_pose(&lookup, &pose, "base_laser", "base_link").unwrap();
        let back = transform_pose(&lookup, &there, "base_link", "base_laser").unwrap();

        assert_eq!(back.frame_id, "base_laser");
        assert!((back.position() - pose.position()).norm() < 1e-9);
        assert!((back.yaw() - pose.yaw()).abs() < 1e-9);
    }
}
