//! 3D rigid-body pose for sensor position and orientation.
//!
//! Coordinate frame follows ROS REP-103:
//! - X-forward, Y-left, Z-up (right-handed)
//! - Rotations are unit quaternions, (w, x, y, z) convention

use super::point::Vec3;
use serde::{Deserialize, Serialize};

/// A unit quaternion representing a 3D rotation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// Create a quaternion from raw components. The caller is responsible
    /// for providing a unit quaternion (|q| = 1); use [`Quaternion::normalize`]
    /// when the source is not trusted.
    #[inline]
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    #[inline]
    pub const fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotation of `angle` radians about a (not necessarily unit) axis.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let axis = axis.normalize();
        let (sin, cos) = (angle / 2.0).sin_cos();
        Self::new(cos, axis.x * sin, axis.y * sin, axis.z * sin)
    }

    /// Hamilton product: compose two rotations.
    #[inline]
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    #[inline]
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rescale to unit length.
    pub fn normalize(self) -> Self {
        let norm = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if norm > 0.0 {
            let inv = 1.0 / norm;
            Self::new(self.w * inv, self.x * inv, self.y * inv, self.z * inv)
        } else {
            Self::identity()
        }
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    #[inline]
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Normalized linear interpolation towards another rotation.
    ///
    /// Takes the shorter arc (flips sign when the dot product is negative).
    /// Accurate enough for the small inter-sample steps of a transform
    /// history; not a general-purpose slerp.
    pub fn nlerp(self, other: Self, t: f32) -> Self {
        let dot = self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z;
        let other = if dot < 0.0 {
            Self::new(-other.w, -other.x, -other.y, -other.z)
        } else {
            other
        };
        Self::new(
            self.w + (other.w - self.w) * t,
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
        .normalize()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// A rigid-body 3D transform: rotation followed by translation.
///
/// Represents the pose of frame B relative to frame A: to convert a point
/// expressed in frame B into frame A, rotate it by `rotation` then add
/// `translation`.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose3D {
    /// Translation in meters.
    pub translation: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quaternion,
}

impl Pose3D {
    /// Create a pose from translation and rotation.
    #[inline]
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Create an identity pose (origin, no rotation).
    #[inline]
    pub const fn identity() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quaternion::identity(),
        }
    }

    /// Create a pure translation.
    #[inline]
    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vec3::new(x, y, z), Quaternion::identity())
    }

    /// Transform a point from this pose's local frame to the parent frame.
    #[inline]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.rotate(point) + self.translation
    }

    /// Compose this pose with another (chain transformations).
    ///
    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.
    #[inline]
    pub fn compose(&self, other: &Pose3D) -> Self {
        Self::new(
            self.transform_point(other.translation),
            self.rotation.mul(other.rotation),
        )
    }

    /// Compute the inverse of this pose.
    ///
    /// `pose.compose(&pose.inverse())` is the identity up to rounding.
    #[inline]
    pub fn inverse(&self) -> Self {
        let inv_rot = self.rotation.conjugate();
        Self::new(inv_rot.rotate(self.translation * -1.0), inv_rot)
    }

    /// Interpolate between poses: lerp translation, nlerp rotation.
    pub fn interpolate(&self, other: &Pose3D, t: f32) -> Self {
        Self::new(
            self.translation.lerp(&other.translation, t),
            self.rotation.nlerp(other.rotation, t),
        )
    }

    /// Check if this pose is approximately equal to another.
    pub fn approx_eq(&self, other: &Pose3D, pos_epsilon: f32) -> bool {
        self.translation.distance(&other.translation) <= pos_epsilon
            && self.rotation.rotate(Vec3::new(1.0, 0.0, 0.0))
                .distance(&other.rotation.rotate(Vec3::new(1.0, 0.0, 0.0)))
                <= pos_epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_identity_rotate_is_noop() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        let r = Quaternion::identity().rotate(v);
        assert_relative_eq!(r.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(r.y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(r.z, 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_90deg_yaw_rotates_x_to_y() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2);
        let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(r.x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(r.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(r.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_conjugate_is_inverse() {
        let q = Quaternion::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.7);
        let prod = q.mul(q.conjugate());
        assert_relative_eq!(prod.w, 1.0, epsilon = 1e-5);
        assert!(prod.x.abs() < 1e-5 && prod.y.abs() < 1e-5 && prod.z.abs() < 1e-5);
    }

    #[test]
    fn test_transform_point_rotation_then_translation() {
        // Sensor at (1, 0, 0), yawed 90° CCW: local +X maps to world +Y.
        let pose = Pose3D::new(
            Vec3::new(1.0, 0.0, 0.0),
            Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2),
        );
        let world = pose.transform_point(Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(world.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(world.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(world.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_compose_translations_add() {
        let a = Pose3D::from_translation(1.0, 0.0, 0.0);
        let b = Pose3D::from_translation(2.0, 0.5, 0.0);
        let c = a.compose(&b);
        assert_relative_eq!(c.translation.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(c.translation.y, 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_inverse_round_trip() {
        let pose = Pose3D::new(
            Vec3::new(1.0, -2.0, 0.5),
            Quaternion::from_axis_angle(Vec3::new(0.3, 1.0, 0.2), 1.1),
        );
        let identity = pose.compose(&pose.inverse());
        assert!(identity.translation.length() < 1e-5);
        assert_relative_eq!(identity.rotation.w.abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_inverse_transform_recovers_point() {
        let pose = Pose3D::new(
            Vec3::new(0.4, 0.1, -0.3),
            Quaternion::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), 0.9),
        );
        let local = Vec3::new(2.0, -1.0, 0.5);
        let world = pose.transform_point(local);
        let back = pose.inverse().transform_point(world);
        assert!(back.distance(&local) < 1e-5);
    }

    #[test]
    fn test_interpolate_endpoints_and_midpoint() {
        let a = Pose3D::from_translation(0.0, 0.0, 0.0);
        let b = Pose3D::new(
            Vec3::new(2.0, 0.0, 0.0),
            Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2),
        );

        assert!(a.interpolate(&b, 0.0).approx_eq(&a, 1e-5));
        assert!(a.interpolate(&b, 1.0).approx_eq(&b, 1e-4));

        let mid = a.interpolate(&b, 0.5);
        assert_relative_eq!(mid.translation.x, 1.0, epsilon = 1e-5);
        // Half the yaw: local +X should map to (cos45°, sin45°, 0).
        let fwd = mid.rotation.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(fwd.x, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-4);
        assert_relative_eq!(fwd.y, std::f32::consts::FRAC_1_SQRT_2, epsilon = 1e-4);
    }

    #[test]
    fn test_nlerp_takes_shorter_arc() {
        let q = Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), 0.4);
        let negated = Quaternion::new(-q.w, -q.x, -q.y, -q.z);
        // q and -q are the same rotation; interpolation must not swing
        // through the far side of the hypersphere.
        let mid = Quaternion::identity().nlerp(negated, 0.5);
        let fwd = mid.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(fwd.y, (0.2f32).sin(), epsilon = 1e-3);
    }
}
