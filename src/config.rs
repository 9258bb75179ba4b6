// src/config.rs
// Tracker parameters, loaded from YAML at start-up and read-only afterwards.

use std::path::Path;

use nalgebra::{Isometry3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transform::StampedTransform;
use crate::visualization::Color;

/// Main configuration structure for the tracker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Steering gain and carried linear speed
    pub control: ControlConfig,
    /// Scan window around the closest point
    pub window: WindowConfig,
    /// Frame ids used by the control cycle
    pub frames: FrameConfig,
    /// Visualization marker settings
    pub marker: MarkerConfig,
    /// Transform cache settings
    pub transforms: TransformConfig,
}

/// Proportional controller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Proportional gain applied to the heading error
    pub kp: f64,
    /// Forward speed of the first command (m/s); later cycles carry it over
    pub linear_speed: f64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            kp: 1.0,
            linear_speed: 0.5,
        }
    }
}

/// Window extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Readings kept on each side of the closest point
    pub half_width: isize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig { half_width: 10 }
    }
}

/// Frame ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frame of scans that arrive without a frame id
    pub scan_frame: String,
    /// Frame the heading error is measured in
    pub control_frame: String,
    /// Extra frame to publish the obstacle marker in, if any
    pub display_frame: Option<String>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig {
            scan_frame: "base_laser".to_string(),
            control_frame: "base_link".to_string(),
            display_frame: Some("odom".to_string()),
        }
    }
}

/// Marker settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    /// Id of the scan-frame marker; the display-frame marker uses `id + 1`
    pub id: i32,
    /// Marker color
    pub color: Color,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        MarkerConfig {
            id: 0,
            color: Color::new(0.0, 1.0, 0.0, 1.0),
        }
    }
}

/// Transform cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Tolerated gap between a request time and buffered data (s)
    pub tolerance_secs: f64,
    /// Longest a lookup waits for the cache (ms)
    pub lock_timeout_ms: u64,
    /// Samples kept per frame pair
    pub history: usize,
    /// Transforms that never change (sensor mounts)
    pub static_transforms: Vec<StaticTransformConfig>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig {
            tolerance_secs: 0.1,
            lock_timeout_ms: 10,
            history: 100,
            static_transforms: Vec::new(),
        }
    }
}

/// A fixed parent-from-child transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTransformConfig {
    /// Parent frame id
    pub parent: String,
    /// Child frame id
    pub child: String,
    /// Child origin in the parent frame (m)
    #[serde(default)]
    pub translation: [f64; 3],
    /// Roll, pitch and yaw of the child frame (rad)
    #[serde(default)]
    pub rotation_rpy: [f64; 3],
}

impl StaticTransformConfig {
    /// Stamped transform described by this entry
    pub fn to_transform(&self) -> StampedTransform {
        let [x, y, z] = self.translation;
        let [roll, pitch, yaw] = self.rotation_rpy;
        StampedTransform::new(
            self.parent.clone(),
            self.child.clone(),
            0.0,
            Isometry3::from_parts(
                Translation3::new(x, y, z),
                UnitQuaternion::from_euler_angles(roll, pitch, yaw),
            ),
        )
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// The YAML does not describe a configuration
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// A value is out of range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl TrackerConfig {
    /// Loads and validates a YAML configuration file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config_file = std::fs::File::open(path)?;
        let config: TrackerConfig = serde_yaml::from_reader(config_file)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: TrackerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges the control cycle relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.control.kp.is_finite() && self.control.kp > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "kp must be a positive number, got {}",
                self.control.kp
            )));
        }
        if !self.control.linear_speed.is_finite() {
            return Err(ConfigError::Invalid("linear_speed must be finite".to_string()));
        }
        if self.window.half_width <= 0 {
            return Err(ConfigError::Invalid(format!(
                "window half_width must be positive, got {}",
                self.window.half_width
            )));
        }
        if self.frames.scan_frame.is_empty() || self.frames.control_frame.is_empty() {
            return Err(ConfigError::Invalid("frame ids must not be empty".to_string()));
        }
        if self
            .frames
            .display_frame
            .as_ref()
            .is_some_and(|frame| frame.is_empty())
        {
            return Err(ConfigError::Invalid("display_frame must not be empty".to_string()));
        }
        if !(self.transforms.tolerance_secs.is_finite() && self.transforms.tolerance_secs >= 0.0) {
            return Err(ConfigError::Invalid(
                "transform tolerance must be a non-negative number".to_string(),
            ));
        }
        if self.marker.id == i32::MAX && self.frames.display_frame.is_some() {
            return Err(ConfigError::Invalid(
                "marker id leaves no room for the display marker".to_string(),
            ));
        }
        Ok(())
    }
}
