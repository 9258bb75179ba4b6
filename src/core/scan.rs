//! Range scan representation
//!
//! A single sweep of distance readings at evenly spaced angles, laid out the
//! same way as `sensor_msgs/LaserScan` so that conversion from ROS is a field copy.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header attached to every scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanHeader {
    /// Frame the readings are measured in (e.g. `base_laser`)
    #[serde(default)]
    pub frame_id: String,
    /// Acquisition time in seconds, if known
    #[serde(default)]
    pub stamp: Option<f64>,
}

/// A 2-D range scan
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeScan {
    /// Frame and time of the sweep
    #[serde(default)]
    pub header: ScanHeader,
    /// Angle of the first reading (rad)
    pub angle_min: f32,
    /// Angle of the last reading (rad)
    pub angle_max: f32,
    /// Angular distance between readings (rad)
    pub angle_increment: f32,
    /// Time between readings (s)
    #[serde(default)]
    pub time_increment: f32,
    /// Time between scans (s)
    #[serde(default)]
    pub scan_time: f32,
    /// Minimum valid range (m)
    pub range_min: f32,
    /// Maximum valid range (m)
    pub range_max: f32,
    /// Range readings; NaN, infinities and out-of-range values are invalid
    pub ranges: Vec<f32>,
    /// Optional intensities, same length as `ranges` when present
    #[serde(default)]
    pub intensities: Vec<f32>,
}

/// Errors raised when a scan breaks its own layout contract
#[derive(Debug, Error, PartialEq)]
pub enum ScanError {
    /// The scan has no readings at all
    #[error("scan contains no readings")]
    Empty,
    /// The angle increment cannot index readings
    #[error("invalid angle increment: {0}")]
    InvalidIncrement(f32),
    /// Reading count does not match the angular extent
    #[error("malformed scan: angles describe {expected} readings but {actual} are present")]
    Malformed {
        /// Count implied by `angle_min`, `angle_max` and `angle_increment`
        expected: usize,
        /// Count actually present
        actual: usize,
    },
}

impl RangeScan {
    /// Builds a scan from its first angle and increment, deriving `angle_max`
    /// from the number of readings.
    pub fn new(
        frame_id: impl Into<String>,
        angle_min: f32,
        angle_increment: f32,
        range_min: f32,
        range_max: f32,
        ranges: Vec<f32>,
    ) -> Self {
        let last = ranges.len().saturating_sub(1);
        RangeScan {
            header: ScanHeader {
                frame_id: frame_id.into(),
                stamp: None,
            },
            angle_min,
            angle_max: angle_min + last as f32 * angle_increment,
            angle_increment,
            time_increment: 0.0,
            scan_time: 0.0,
            range_min,
            range_max,
            ranges,
            intensities: Vec::new(),
        }
    }

    /// Sets the acquisition time
    pub fn with_stamp(mut self, stamp: f64) -> Self {
        self.header.stamp = Some(stamp);
        self
    }

    /// Number of readings
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// True when the scan has no readings
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Angle of reading `index`
    pub fn angle_at(&self, index: usize) -> f32 {
        self.angle_min + index as f32 * self.angle_increment
    }

    /// A reading is valid when it is finite and inside `[range_min, range_max]`.
    pub fn is_valid_reading(&self, range: f32) -> bool {
        range.is_finite() && range >= self.range_min && range <= self.range_max
    }

    /// Cartesian position of a reading in the scan frame
    pub fn point_at(&self, index: usize, distance: f32) -> Point2<f64> {
        let angle = f64::from(self.angle_at(index));
        let distance = f64::from(distance);
        Point2::new(distance * angle.cos(), distance * angle.sin())
    }

    /// Checks that the reading count matches the angular extent.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.ranges.is_empty() {
            return Err(ScanError::Empty);
        }
        if !self.angle_increment.is_finite() || self.angle_increment == 0.0 {
            // A single reading has no extent, any increment describes it
            if self.ranges.len() == 1 && self.angle_min == self.angle_max {
                return Ok(());
            }
            return Err(ScanError::InvalidIncrement(self.angle_increment));
        }

        let steps = ((self.angle_max - self.angle_min) / self.angle_increment).round();
        if !steps.is_finite() || steps < 0.0 {
            return Err(ScanError::InvalidIncrement(self.angle_increment));
        }
        let expected = steps as usize + 1;
        if expected != self.ranges.len() {
            return Err(ScanError::Malformed {
                expected,
                actual: self.ranges.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::f32::consts::FRAC_PI_2;

    fn quarter_scan() -> RangeScan {
        RangeScan::new("base_laser", 0.0, FRAC_PI_2, 0.1, 10.0, vec![1.0, 2.0, 3.0])
    }

    #[test]
    fn new_derives_angle_max() {
        let scan = quarter_scan();
        assert!((scan.angle_max - std::f32::consts::PI).abs() < 1e-6);
        assert!(scan.validate().is_ok());
    }

    #[rstest]
    #[case(0.05, false)]
    #[case(0.1, true)]
    #[case(5.0, true)]
    #[case(10.0, true)]
    #[case(10.5, false)]
    #[case(f32::NAN, false)]
    #[case(f32::INFINITY, false)]
    #[case(f32::NEG_INFINITY, false)]
    fn reading_validity(#[case] range: f32, #[case] valid: bool) {
        assert_eq!(quarter_scan().is_valid_reading(range), valid);
    }

    #[test]
    fn point_at_uses_reading_angle() {
        let scan = quarter_scan();
        let point = scan.point_at(1, 2.0);
        assert!(point.x.abs() < 1e-6);
        assert!((point.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn validate_rejects_count_mismatch() {
        let mut scan = quarter_scan();
        scan.ranges.push(4.0);
        assert_eq!(
            scan.validate(),
            Err(ScanError::Malformed {
                expected: 3,
                actual: 4
            })
        );
    }

    #[test]
    fn validate_rejects_empty_and_zero_increment() {
        let empty = RangeScan::new("laser", 0.0, 0.1, 0.1, 10.0, Vec::new());
        assert_eq!(empty.validate(), Err(ScanError::Empty));

        let mut flat = quarter_scan();
        flat.angle_increment = 0.0;
        assert_eq!(flat.validate(), Err(ScanError::InvalidIncrement(0.0)));
    }

    #[test]
    fn single_reading_scan_is_valid() {
        let scan = RangeScan::new("laser", 0.3, 0.0, 0.1, 10.0, vec![1.0]);
        assert!(scan.validate().is_ok());
    }
}
