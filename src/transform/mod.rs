//! Coordinate-frame transforms
//!
//! The control cycle never owns the transform tree. It asks a
//! [`TransformLookup`] for the rigid-body transform between two named frames
//! at a point in time; [`TransformBuffer`] is the in-memory implementation fed
//! by static configuration or a `/tf` subscriber.

mod buffer;

pub use buffer::TransformBuffer;

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Rigid-body transform between two frames at a given time.
///
/// `isometry` maps coordinates expressed in `child_frame` into `parent_frame`,
/// the same convention as `geometry_msgs/TransformStamped`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedTransform {
    /// Frame the result is expressed in
    pub parent_frame: String,
    /// Frame the input is expressed in
    pub child_frame: String,
    /// Time the transform is valid for (s)
    pub stamp: f64,
    /// Child-to-parent mapping
    pub isometry: Isometry3<f64>,
}

impl StampedTransform {
    /// Creates a stamped transform
    pub fn new(
        parent_frame: impl Into<String>,
        child_frame: impl Into<String>,
        stamp: f64,
        isometry: Isometry3<f64>,
    ) -> Self {
        StampedTransform {
            parent_frame: parent_frame.into(),
            child_frame: child_frame.into(),
            stamp,
            isometry,
        }
    }

    /// Identity transform of a frame onto itself
    pub fn identity(frame: impl Into<String>, stamp: f64) -> Self {
        let frame = frame.into();
        StampedTransform::new(frame.clone(), frame, stamp, Isometry3::identity())
    }

    /// The same transform seen from the other side
    pub fn inverse(&self) -> Self {
        StampedTransform {
            parent_frame: self.child_frame.clone(),
            child_frame: self.parent_frame.clone(),
            stamp: self.stamp,
            isometry: self.isometry.inverse(),
        }
    }
}

/// Transform lookup failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    /// No transform mentions the frame
    #[error("frame '{0}' does not exist in the transform tree")]
    UnknownFrame(String),
    /// Both frames exist but are not connected
    #[error("no transform path from '{source_frame}' to '{target_frame}'")]
    NoPath {
        /// Frame being transformed from
        source_frame: String,
        /// Frame being transformed into
        target_frame: String,
    },
    /// The request lies outside the buffered time range plus tolerance
    #[error(
        "lookup of '{frame}' at {requested:.3}s would extrapolate, data covers [{oldest:.3}, {newest:.3}]"
    )]
    Extrapolation {
        /// Child frame of the offending edge
        frame: String,
        /// Requested time
        requested: f64,
        /// Oldest buffered sample
        oldest: f64,
        /// Newest buffered sample
        newest: f64,
    },
    /// A time stamp is NaN or infinite
    #[error("time stamp {0} is not a finite number of seconds")]
    InvalidStamp(f64),
    /// A rotation is not a unit quaternion
    #[error("rotation of frame '{0}' is not a unit quaternion")]
    InvalidRotation(String),
    /// The cache could not be read in time
    #[error("transform cache busy for more than {0:?}")]
    Timeout(Duration),
    /// A pose was handed in with a frame other than the one requested
    #[error("pose is expressed in '{actual}', expected '{expected}'")]
    FrameMismatch {
        /// Frame named by the caller
        expected: String,
        /// Frame carried by the pose
        actual: String,
    },
}

/// Point-in-time query against a transform cache.
///
/// Implementations must answer without blocking indefinitely: a busy or
/// stale cache is reported as an error so the control cycle keeps running.
#[cfg_attr(test, mockall::automock)]
pub trait TransformLookup {
    /// Transform mapping `source_frame` coordinates into `target_frame` at
    /// `stamp`, or when `stamp` is `None` at the latest time for which every
    /// edge between the two frames has data.
    fn lookup_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
        stamp: Option<f64>,
    ) -> Result<StampedTransform, TransformError>;
}

impl<T: TransformLookup + ?Sized> TransformLookup for &T {
    fn lookup_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
        stamp: Option<f64>,
    ) -> Result<StampedTransform, TransformError> {
        (**self).lookup_transform(target_frame, source_frame, stamp)
    }
}

impl<T: TransformLookup + ?Sized> TransformLookup for std::sync::Arc<T> {
    fn lookup_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
        stamp: Option<f64>,
    ) -> Result<StampedTransform, TransformError> {
        (**self).lookup_transform(target_frame, source_frame, stamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn inverse_swaps_frames_and_undoes_mapping() {
        let transform = StampedTransform::new(
            "odom",
            "base_link",
            1.5,
            Isometry3::new(Vector3::new(1.0, 2.0, 0.0), Vector3::new(0.0, 0.0, 0.7)),
        );
        let inverse = transform.inverse();
        assert_eq!(inverse.parent_frame, "base_link");
        assert_eq!(inverse.child_frame, "odom");

        let point = Point3::new(0.3, -0.4, 0.0);
        let back = inverse.isometry * (transform.isometry * point);
        assert!((back - point).norm() < 1e-12);
    }

    #[test]
    fn error_messages_name_frames() {
        let err = TransformError::NoPath {
            source_frame: "laser".to_string(),
            target_frame: "map".to_string(),
        };
        assert!(err.to_string().contains("laser"));
        assert!(err.to_string().contains("map"));
        assert!(
            TransformError::UnknownFrame("odom".to_string())
                .to_string()
                .contains("odom")
        );
    }
}
