//! Output cloud types produced by surface extraction.

use ghana_map::core::{Rgba, Vec3};

/// Colored surface point cloud, attributed to a frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorCloud {
    /// Frame the points are expressed in.
    pub frame_id: String,
    /// Timestamp of the extraction's source data, microseconds.
    pub stamp_us: u64,
    /// Point positions.
    pub points: Vec<Vec3>,
    /// Per-point colors.
    pub colors: Vec<Rgba>,
}

impl ColorCloud {
    /// Create an empty cloud pre-sized for `capacity` points.
    pub fn with_capacity(frame_id: &str, stamp_us: u64, capacity: usize) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            stamp_us,
            points: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
        }
    }

    /// Append a colored point.
    #[inline]
    pub fn push(&mut self, point: Vec3, color: Rgba) {
        self.points.push(point);
        self.colors.push(color);
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Point cloud with a scalar intensity per point (signed distance for the
/// full-volume diagnostic output).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntensityCloud {
    /// Frame the points are expressed in.
    pub frame_id: String,
    /// Timestamp of the extraction's source data, microseconds.
    pub stamp_us: u64,
    /// Point positions.
    pub points: Vec<Vec3>,
    /// Per-point scalar intensity.
    pub intensities: Vec<f32>,
}

impl IntensityCloud {
    /// Create an empty cloud pre-sized for `capacity` points.
    pub fn with_capacity(frame_id: &str, stamp_us: u64, capacity: usize) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            stamp_us,
            points: Vec::with_capacity(capacity),
            intensities: Vec::with_capacity(capacity),
        }
    }

    /// Append a point with its intensity.
    #[inline]
    pub fn push(&mut self, point: Vec3, intensity: f32) {
        self.points.push(point);
        self.intensities.push(intensity);
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
