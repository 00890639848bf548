//! Cloud sanitizer: field normalization, color decoding, NaN stripping.
//!
//! Turns a [`RawCloud`] into index-aligned position and color arrays:
//! - the color field's declared type is corrected before any byte is
//!   interpreted (see [`normalize_color_field`])
//! - every point with a non-finite coordinate is removed, position and
//!   color in lock-step
//! - surviving points keep their original relative order

use std::sync::atomic::{AtomicBool, Ordering};

use ghana_map::core::{Rgba, Vec3};

use super::fields::{normalize_color_field, CloudField, COLOR_FIELD};
use super::raw::RawCloud;
use crate::error::{FusionError, Result};

/// Clean, decoded point cloud: finite positions with their colors.
///
/// `points` and `colors` have the same length and are index-aligned; both
/// are an order-preserving subset of the raw input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SanitizedCloud {
    /// Finite 3D positions in the sensor frame.
    pub points: Vec<Vec3>,
    /// Per-point RGBA colors.
    pub colors: Vec<Rgba>,
}

impl SanitizedCloud {
    /// Create an empty cloud.
    pub fn new() -> Self {
        Self::default()
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

/// Decodes and cleans raw clouds.
#[derive(Debug, Clone, Default)]
pub struct Sanitizer;

impl Sanitizer {
    /// Create a sanitizer.
    pub fn new() -> Self {
        Self
    }

    /// Decode a raw cloud into finite positions and colors.
    ///
    /// An empty input produces an empty output. A cloud without a color
    /// field decodes with an opaque default color. Structurally malformed
    /// clouds (missing position fields, records reaching past the buffer)
    /// are rejected.
    pub fn apply(&self, raw: &RawCloud) -> Result<SanitizedCloud> {
        // Log the declared channel layout once; every subsequent cloud from
        // the same producer repeats it.
        static FIELDS_LOGGED: AtomicBool = AtomicBool::new(false);
        if !FIELDS_LOGGED.swap(true, Ordering::Relaxed) {
            let names: Vec<&str> = raw.fields.iter().map(|f| f.name.as_str()).collect();
            log::debug!("cloud fields: [{}]", names.join(", "));
        }

        let fields: Vec<CloudField> = raw.fields.iter().map(normalize_color_field).collect();

        let x = Self::require_field(&fields, "x")?;
        let y = Self::require_field(&fields, "y")?;
        let z = Self::require_field(&fields, "z")?;
        let color = fields.iter().find(|f| f.name == COLOR_FIELD);

        for field in [Some(x), Some(y), Some(z), color].into_iter().flatten() {
            let needed = field.offset + field.datatype.size();
            if needed > raw.point_step {
                return Err(FusionError::TruncatedData {
                    index: 0,
                    needed,
                    available: raw.point_step,
                });
            }
        }

        let count = raw.len();
        let mut cloud = SanitizedCloud {
            points: Vec::with_capacity(count),
            colors: Vec::with_capacity(count),
        };

        for i in 0..count {
            let record = i * raw.point_step;
            let end = record + raw.point_step;
            if end > raw.data.len() {
                return Err(FusionError::TruncatedData {
                    index: i,
                    needed: end,
                    available: raw.data.len(),
                });
            }

            let position = Vec3::new(
                Self::read_f32(&raw.data, record + x.offset),
                Self::read_f32(&raw.data, record + y.offset),
                Self::read_f32(&raw.data, record + z.offset),
            );
            if !position.is_finite() {
                continue;
            }

            let rgba = match color {
                Some(field) => {
                    Rgba::from_packed_float(Self::read_f32(&raw.data, record + field.offset))
                }
                None => Rgba::default(),
            };

            cloud.points.push(position);
            cloud.colors.push(rgba);
        }

        let dropped = count - cloud.len();
        if dropped > 0 {
            log::debug!("dropped {} non-finite points of {}", dropped, count);
        }

        Ok(cloud)
    }

    fn require_field<'a>(fields: &'a [CloudField], name: &'static str) -> Result<&'a CloudField> {
        fields
            .iter()
            .find(|f| f.name == name)
            .ok_or(FusionError::MissingField(name))
    }

    #[inline]
    fn read_f32(data: &[u8], offset: usize) -> f32 {
        // Bounds were checked against point_step before the decode loop.
        f32::from_le_bytes(data[offset..offset + 4].try_into().expect("4-byte slice"))
    }
}
