// src/navigation/controller.rs
// Proportional heading control toward the tracked obstacle.

use log::debug;

use super::VelocityCommand;
use crate::core::Pose;

/// Heading of a pose's position seen from the origin of its frame (rad).
///
/// Positive when the position lies counter-clockwise of the frame's x-axis,
/// i.e. to the left of a robot facing +x, which is also the direction a
/// positive yaw rate turns.
pub fn heading_error(pose: &Pose) -> f64 {
    let position = pose.position();
    position.y.atan2(position.x)
}

/// Applies `angular = kp * angle_error`, copying the linear part of `old_cmd`.
///
/// The output is not saturated; actuator limits belong to the caller.
pub fn calculate_p_ratio(old_cmd: &VelocityCommand, kp: f64, angle_error: f64) -> VelocityCommand {
    VelocityCommand {
        linear: old_cmd.linear,
        angular: kp * angle_error,
    }
}

/// Proportional controller bound to a fixed gain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingController {
    kp: f64,
}

impl HeadingController {
    /// Creates a controller with gain `kp`
    pub fn new(kp: f64) -> Self {
        HeadingController { kp }
    }

    /// Steers toward `target`, which must be expressed in the control frame.
    pub fn steer(&self, previous: &VelocityCommand, target: &Pose) -> VelocityCommand {
        let error = heading_error(target);
        let command = calculate_p_ratio(previous, self.kp, error);
        debug!(
            "Heading error {:.3} rad in '{}' -> angular {:.3} rad/s",
            error, target.frame_id, command.angular
        );
        command
    }
}
