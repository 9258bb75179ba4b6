//! Husky tracker - closest-obstacle tracking for laser-equipped robots
//!
//! This library provides the control core of a reactive tracker: it finds the
//! nearest valid return in a range scan, crops the scan around it, expresses the
//! obstacle in the robot's control frame through an injected transform lookup and
//! steers toward it with a proportional heading law. A marker for the detected
//! point is built for visualization.

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Tracker parameters and their YAML loading
pub mod config;
pub mod core;
pub mod navigation;
pub mod tracker;
pub mod transform;
pub mod visualization;

#[cfg(feature = "ros")]
pub mod ros_interface;

// Re-export commonly used items for easier access
pub use self::config::{ConfigError, TrackerConfig};
pub use self::core::{ClosestPoint, Pose, RangeScan, ScanError, WindowError};
pub use self::navigation::{HeadingController, VelocityCommand};
pub use self::tracker::{CycleOutput, ObstacleTracker, Result, TrackerError};
pub use self::transform::{StampedTransform, TransformBuffer, TransformError, TransformLookup};
pub use self::visualization::{Color, Marker};
