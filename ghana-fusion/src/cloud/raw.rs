//! Packed point cloud message as received from a sensor stream.

use ghana_map::core::{Rgba, Vec3};

use super::fields::{CloudField, FieldType, COLOR_FIELD};

/// A raw colored point cloud: a field descriptor table plus a packed
/// little-endian byte buffer, one fixed-size record per point.
///
/// Owned transiently during a single processing cycle; the sanitizer reads
/// it and produces clean parallel arrays.
#[derive(Clone, Debug, PartialEq)]
pub struct RawCloud {
    /// Frame the points are expressed in (sensor frame id).
    pub frame_id: String,
    /// Acquisition timestamp in microseconds.
    pub stamp_us: u64,
    /// Per-point channel descriptors.
    pub fields: Vec<CloudField>,
    /// Size of one point record in bytes.
    pub point_step: usize,
    /// Packed point records, `point_step * len()` bytes.
    pub data: Vec<u8>,
}

impl RawCloud {
    /// Point record layout produced by [`RawCloud::from_points`]:
    /// x/y/z floats followed by a packed-float rgb slot.
    const XYZRGB_STEP: usize = 16;

    /// Create an empty cloud with the standard xyz + rgb layout.
    pub fn empty(frame_id: &str, stamp_us: u64) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            stamp_us,
            fields: Self::xyzrgb_fields(),
            point_step: Self::XYZRGB_STEP,
            data: Vec::new(),
        }
    }

    /// Pack position/color pairs into a correctly-declared xyz + rgb cloud.
    pub fn from_points(frame_id: &str, stamp_us: u64, points: &[(Vec3, Rgba)]) -> Self {
        let mut cloud = Self::empty(frame_id, stamp_us);
        cloud.data.reserve(points.len() * Self::XYZRGB_STEP);
        for (position, color) in points {
            cloud.push(*position, *color);
        }
        cloud
    }

    /// Append one point record.
    pub fn push(&mut self, position: Vec3, color: Rgba) {
        debug_assert_eq!(self.point_step, Self::XYZRGB_STEP, "push requires xyzrgb layout");
        self.data.extend_from_slice(&position.x.to_le_bytes());
        self.data.extend_from_slice(&position.y.to_le_bytes());
        self.data.extend_from_slice(&position.z.to_le_bytes());
        self.data
            .extend_from_slice(&color.to_packed_float().to_le_bytes());
    }

    /// Re-declare a field's element type, keeping the packed bytes as-is.
    ///
    /// Simulates upstream producers that pack float-slot color bits but
    /// advertise the channel under an integer type.
    pub fn with_declared_type(mut self, name: &str, datatype: FieldType) -> Self {
        for field in &mut self.fields {
            if field.name == name {
                field.datatype = datatype;
            }
        }
        self
    }

    /// Number of points.
    #[inline]
    pub fn len(&self) -> usize {
        if self.point_step == 0 {
            0
        } else {
            self.data.len() / self.point_step
        }
    }

    /// Check if the cloud has no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find a field descriptor by name.
    pub fn field(&self, name: &str) -> Option<&CloudField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn xyzrgb_fields() -> Vec<CloudField> {
        vec![
            CloudField::new("x", FieldType::Float32, 0),
            CloudField::new("y", FieldType::Float32, 4),
            CloudField::new("z", FieldType::Float32, 8),
            CloudField::new(COLOR_FIELD, FieldType::Float32, 12),
        ]
    }
}
