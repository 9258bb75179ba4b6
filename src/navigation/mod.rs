//! Steering for the obstacle tracker
//!
//! Turns the obstacle pose, expressed in the control frame, into a velocity
//! command with a proportional heading law.

mod controller;

pub use controller::{HeadingController, calculate_p_ratio, heading_error};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Velocity command for the robot base
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityCommand {
    /// Linear velocity (m/s)
    pub linear: Vector3<f64>,
    /// Yaw rate (rad/s), positive turns counter-clockwise
    pub angular: f64,
}

impl Default for VelocityCommand {
    fn default() -> Self {
        VelocityCommand::stop()
    }
}

impl VelocityCommand {
    /// Command that keeps the robot still
    pub fn stop() -> Self {
        VelocityCommand {
            linear: Vector3::zeros(),
            angular: 0.0,
        }
    }

    /// Straight-line motion along the robot x-axis
    pub fn forward(speed: f64) -> Self {
        VelocityCommand {
            linear: Vector3::new(speed, 0.0, 0.0),
            angular: 0.0,
        }
    }
}
