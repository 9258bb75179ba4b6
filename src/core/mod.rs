//! Perception and localization primitives of the tracker
//!
//! The range scan, the closest-point search, the scan window and
//! frame-tagged poses.

/// Frame-tagged poses and the pose transformer
pub mod localization;
/// Closest-point search and scan windows
pub mod perception;
pub mod scan;

// Re-export key types and functions for a unified API
pub use localization::{Pose, transform_pose};
pub use perception::{ClosestPoint, WindowError, create_laser_scan_around_md, get_minimal_distance};
pub use scan::{RangeScan, ScanError, ScanHeader};
