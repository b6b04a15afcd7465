//! Colored point and point-cloud types.

use serde::{Deserialize, Serialize};

/// A single colored 3D point (meters, 8-bit color channels).
///
/// The color channels hold RGB as received from the sensor; after
/// normalization (see [`crate::core::color`]) they hold quantized CIELAB.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct PointRgb {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PointRgb {
    /// Create a new colored point
    #[inline]
    pub fn new(x: f32, y: f32, z: f32, r: u8, g: u8, b: u8) -> Self {
        Self { x, y, z, r, g, b }
    }

    /// Position as an array
    #[inline]
    pub fn position(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

/// A colored point cloud with the sensor origin it was observed from.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ColoredCloud {
    pub points: Vec<PointRgb>,
    /// Sensor position in the cloud's frame. Integrated observations lack
    /// an embedded origin, so it is fetched separately and attached here.
    pub sensor_origin: [f32; 3],
}

impl ColoredCloud {
    /// Create a new empty cloud
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cloud with reserved capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            sensor_origin: [0.0; 3],
        }
    }

    /// Number of points
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the cloud is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point
    #[inline]
    pub fn push(&mut self, point: PointRgb) {
        self.points.push(point);
    }
}
