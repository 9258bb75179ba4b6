// core/perception.rs

// Finds the closest obstacle return in a range scan and crops the scan to the
// window around it. Both operations are pure: they read the incoming scan and
// build fresh values, nothing is kept between control cycles.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::scan::RangeScan;

/// Index and range of the nearest valid reading in a scan
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosestPoint {
    /// Position of the reading in `RangeScan::ranges`
    pub index: usize,
    /// Measured range (m)
    pub distance: f32,
}

/// Reasons a window cannot be cut out of a scan
#[derive(Debug, Error, PartialEq)]
pub enum WindowError {
    /// Centre index does not address a reading
    #[error("closest index {index} outside scan of {len} readings")]
    IndexOutOfRange {
        /// Requested centre index
        index: isize,
        /// Number of readings in the scan
        len: usize,
    },
    /// Half-width must be at least one reading
    #[error("window half-width must be positive, got {0}")]
    NonPositiveRangeSize(isize),
    /// Clamping left nothing to copy
    #[error("window around index {0} is empty")]
    EmptyWindow(usize),
}

/// Returns the closest valid reading, or `None` when the scan has none.
///
/// Ties keep the first occurrence: a later reading only replaces the current
/// minimum when it is strictly smaller.
pub fn get_minimal_distance(scan: &RangeScan) -> Option<ClosestPoint> {
    let mut closest: Option<ClosestPoint> = None;

    for (index, &range) in scan.ranges.iter().enumerate() {
        if !scan.is_valid_reading(range) {
            continue;
        }
        match closest {
            Some(current) if range >= current.distance => {}
            _ => closest = Some(ClosestPoint { index, distance: range }),
        }
    }

    closest
}

/// Creates a new scan holding the readings `[closest_index - range_size,
/// closest_index + range_size]` of `old_scan`, clamped to its bounds.
///
/// Angles are recomputed for the clamped range so that reading `i` of the new
/// scan still sits at `angle_min + i * angle_increment`.
pub fn create_laser_scan_around_md(
    old_scan: &RangeScan,
    closest_index: isize,
    min_val: f32,
    range_size: isize,
) -> Result<RangeScan, WindowError> {
    let len = old_scan.ranges.len();

    if range_size <= 0 {
        return Err(WindowError::NonPositiveRangeSize(range_size));
    }
    let index = usize::try_from(closest_index)
        .ok()
        .filter(|&index| index < len)
        .ok_or(WindowError::IndexOutOfRange {
            index: closest_index,
            len,
        })?;

    let half_width = range_size.unsigned_abs();
    let start = index.saturating_sub(half_width);
    let end = index.saturating_add(half_width).min(len - 1);
    if start > end {
        return Err(WindowError::EmptyWindow(index));
    }

    let centre = old_scan.ranges[index];
    if centre != min_val {
        debug!(
            "Window centre reading {} differs from reported minimum {}",
            centre, min_val
        );
    }

    let intensities = if old_scan.intensities.len() == len {
        old_scan.intensities[start..=end].to_vec()
    } else {
        Vec::new()
    };

    Ok(RangeScan {
        header: old_scan.header.clone(),
        angle_min: old_scan.angle_at(start),
        angle_max: old_scan.angle_at(end),
        angle_increment: old_scan.angle_increment,
        time_increment: old_scan.time_increment,
        scan_time: old_scan.scan_time,
        range_min: old_scan.range_min,
        range_max: old_scan.range_max,
        ranges: old_scan.ranges[start..=end].to_vec(),
        intensities,
    })
}
