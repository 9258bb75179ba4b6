//! One control cycle of the obstacle tracker
//!
//! scan → closest point → window → obstacle pose → control frame →
//! heading error → velocity command, with markers built on the side.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, TrackerConfig};
use crate::core::{
    ClosestPoint, Pose, RangeScan, ScanError, WindowError, create_laser_scan_around_md,
    get_minimal_distance, transform_pose,
};
use crate::navigation::{HeadingController, VelocityCommand};
use crate::transform::{TransformError, TransformLookup};
use crate::visualization::{Marker, create_marker};

/// Why a cycle produced no command
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The scan breaks its layout contract
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// No reading lies within the sensor's valid range
    #[error("no valid reading in scan")]
    NoDetection,
    /// The window around the closest point could not be built
    #[error(transparent)]
    Window(#[from] WindowError),
    /// The obstacle could not be expressed in the control frame
    #[error(transparent)]
    Transform(#[from] TransformError),
    /// The tracker was built from an invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for tracker operations
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Everything a successful cycle produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleOutput {
    /// Closest valid reading
    pub closest: ClosestPoint,
    /// Readings around the closest point
    pub window: RangeScan,
    /// Obstacle pose in the control frame
    pub obstacle: Pose,
    /// Command for the base
    pub command: VelocityCommand,
    /// Scan-frame marker, followed by the display-frame marker when available
    pub markers: Vec<Marker>,
}

/// Closest-obstacle tracker.
///
/// Holds configuration and the transform lookup; no state is carried between
/// cycles apart from what the caller passes back in as `previous`.
pub struct ObstacleTracker<L> {
    config: TrackerConfig,
    lookup: L,
    controller: HeadingController,
}

impl<L: TransformLookup> ObstacleTracker<L> {
    /// Creates a tracker after validating `config`
    pub fn new(config: TrackerConfig, lookup: L) -> Result<Self> {
        config.validate()?;
        info!(
            "Tracking closest obstacle: kp={}, window half-width={}, control frame '{}'",
            config.control.kp, config.window.half_width, config.frames.control_frame
        );
        let controller = HeadingController::new(config.control.kp);
        Ok(ObstacleTracker {
            config,
            lookup,
            controller,
        })
    }

    /// Command to seed the first cycle with
    pub fn initial_command(&self) -> VelocityCommand {
        VelocityCommand::forward(self.config.control.linear_speed)
    }

    /// Runs one control cycle on `scan`.
    ///
    /// Failures are reported to the caller, which decides whether to hold the
    /// previous command, stop, or skip the cycle.
    pub fn run_cycle(&self, scan: &RangeScan, previous: &VelocityCommand) -> Result<CycleOutput> {
        scan.validate()?;

        let closest = get_minimal_distance(scan).ok_or(TrackerError::NoDetection)?;
        debug!(
            "Closest reading {} at {:.3} m ({:.3} rad)",
            closest.index,
            closest.distance,
            scan.angle_at(closest.index)
        );

        let window = create_laser_scan_around_md(
            scan,
            isize::try_from(closest.index).unwrap_or(isize::MAX),
            closest.distance,
            self.config.window.half_width,
        )?;

        let scan_frame = if scan.header.frame_id.is_empty() {
            self.config.frames.scan_frame.as_str()
        } else {
            scan.header.frame_id.as_str()
        };
        let point = scan.point_at(closest.index, closest.distance);
        let in_scan = Pose::from_planar(scan_frame, point.x, point.y, 0.0).with_stamp(scan.header.stamp);

        let control_frame = self.config.frames.control_frame.as_str();
        let obstacle = transform_pose(&self.lookup, &in_scan, scan_frame, control_frame)?;
        let command = self.controller.steer(previous, &obstacle);

        let mut markers = vec![create_marker(
            point.x,
            point.y,
            scan_frame,
            self.config.marker.id,
            self.config.marker.color,
        )];
        if let Some(display_frame) = self.config.frames.display_frame.as_deref() {
            match transform_pose(&self.lookup, &in_scan, scan_frame, display_frame) {
                Ok(shown) => {
                    let position = shown.position();
                    markers.push(create_marker(
                        position.x,
                        position.y,
                        display_frame,
                        self.config.marker.id.saturating_add(1),
                        self.config.marker.color,
                    ));
                }
                Err(err) => warn!("No obstacle marker in '{}': {}", display_frame, err),
            }
        }

        Ok(CycleOutput {
            closest,
            window,
            obstacle,
            command,
            markers,
        })
    }
}
