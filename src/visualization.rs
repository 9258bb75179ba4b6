//! Visualization markers
//!
//! Builds the marker shown at the detected obstacle. Markers have no feedback
//! into control; a marker with the same namespace and id replaces the previous
//! one in the viewer.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Namespace shared by all obstacle markers
pub const MARKER_NAMESPACE: &str = "closest_obstacle";

/// Diameter of the marker sphere (m)
pub const MARKER_SCALE: f64 = 0.2;

/// Height markers are drawn at (m)
pub const MARKER_Z: f64 = 0.0;

/// Marker lifetime in seconds; zero keeps it until replaced
pub const MARKER_LIFETIME_SECS: f64 = 0.0;

/// RGBA color, components in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Opacity
    pub a: f32,
}

impl Color {
    /// Creates a color
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }
}

/// Shape drawn for a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerShape {
    /// Sphere centred on the position
    Sphere,
}

/// What the viewer does with the marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerAction {
    /// Add, or replace a marker with the same namespace and id
    AddOrModify,
}

/// A visualization marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Frame the position is expressed in
    pub frame_id: String,
    /// Grouping namespace
    pub namespace: String,
    /// Identity within the namespace
    pub id: i32,
    /// Shape
    pub shape: MarkerShape,
    /// Action
    pub action: MarkerAction,
    /// Centre of the marker
    pub position: Point3<f64>,
    /// Extent along x, y and z (m)
    pub scale: [f64; 3],
    /// Color
    pub color: Color,
    /// Seconds before the viewer drops it, zero for never
    pub lifetime_secs: f64,
}

/// Builds a sphere marker at `(x, y)` on the ground plane of `frame_id`.
pub fn create_marker(x: f64, y: f64, frame_id: &str, marker_id: i32, color: Color) -> Marker {
    Marker {
        frame_id: frame_id.to_string(),
        namespace: MARKER_NAMESPACE.to_string(),
        id: marker_id,
        shape: MarkerShape::Sphere,
        action: MarkerAction::AddOrModify,
        position: Point3::new(x, y, MARKER_Z),
        scale: [MARKER_SCALE; 3],
        color,
        lifetime_secs: MARKER_LIFETIME_SECS,
    }
}
