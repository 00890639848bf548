//! Point and index types for the voxel grid.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Integer grid coordinates.
///
/// Used both for block indices (signed, unbounded) and for voxel indices
/// within a block (0..voxels_per_side on each axis).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridIndex {
    /// X coordinate (forward in ROS convention)
    pub x: i32,
    /// Y coordinate (left in ROS convention)
    pub y: i32,
    /// Z coordinate (up in ROS convention)
    pub z: i32,
}

/// Index of an allocated block within the sparse volume.
pub type BlockIndex = GridIndex;

/// Index of a voxel within a block's cubic grid.
pub type VoxelIndex = GridIndex;

impl GridIndex {
    /// Create a new grid index
    #[inline]
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The zero index
    pub const ZERO: GridIndex = GridIndex { x: 0, y: 0, z: 0 };
}

impl Add for GridIndex {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        GridIndex::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for GridIndex {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        GridIndex::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

/// World coordinates (meters, f32)
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X coordinate in meters (forward in ROS convention)
    pub x: f32,
    /// Y coordinate in meters (left in ROS convention)
    pub y: f32,
    /// Z coordinate in meters (up in ROS convention)
    pub z: f32,
}

impl Vec3 {
    /// Create a new point
    #[inline]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Zero point (origin)
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(&self, other: &Vec3) -> f32 {
        (*self - *other).length()
    }

    /// Squared distance (faster, avoids sqrt)
    #[inline]
    pub fn distance_squared(&self, other: &Vec3) -> f32 {
        let d = *self - *other;
        d.dot(&d)
    }

    /// Length (magnitude) of this point as a vector from origin
    #[inline]
    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Normalize to unit length
    #[inline]
    pub fn normalize(&self) -> Vec3 {
        let len = self.length();
        if len > 0.0 { *self * (1.0 / len) } else { *self }
    }

    /// Dot product with another point (as vectors)
    #[inline]
    pub fn dot(&self, other: &Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[inline]
    pub fn cross(&self, other: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// True when all three coordinates are finite (no NaN, no infinity)
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Linear interpolation towards another point
    #[inline]
    pub fn lerp(&self, other: &Vec3, t: f32) -> Vec3 {
        *self + (*other - *self) * t
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Vec3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_index_ordering_is_stable() {
        let mut indices = vec![
            GridIndex::new(1, 0, 0),
            GridIndex::new(0, 2, 0),
            GridIndex::new(0, 0, 3),
            GridIndex::new(-1, 5, 5),
        ];
        indices.sort();
        assert_eq!(indices[0], GridIndex::new(-1, 5, 5));
        assert_eq!(indices[1], GridIndex::new(0, 0, 3));
        assert_eq!(indices[2], GridIndex::new(0, 2, 0));
        assert_eq!(indices[3], GridIndex::new(1, 0, 0));
    }

    #[test]
    fn test_vec3_distance() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 3.0, 6.0);
        assert!((a.distance(&b) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn test_vec3_normalize() {
        let v = Vec3::new(0.0, 3.0, 4.0).normalize();
        assert!((v.length() - 1.0).abs() < 1e-6);
        assert!((v.y - 0.6).abs() < 1e-6);
        assert!((v.z - 0.8).abs() < 1e-6);

        // Zero vector stays zero instead of producing NaN
        assert_eq!(Vec3::ZERO.normalize(), Vec3::ZERO);
    }

    #[test]
    fn test_vec3_is_finite() {
        assert!(Vec3::new(1.0, 2.0, 3.0).is_finite());
        assert!(!Vec3::new(f32::NAN, 0.0, 0.0).is_finite());
        assert!(!Vec3::new(0.0, f32::INFINITY, 0.0).is_finite());
        assert!(!Vec3::new(0.0, 0.0, f32::NEG_INFINITY).is_finite());
    }

    #[test]
    fn test_vec3_cross() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        let z = x.cross(&y);
        assert!((z.z - 1.0).abs() < 1e-6);
        assert!(z.x.abs() < 1e-6 && z.y.abs() < 1e-6);
    }
}
