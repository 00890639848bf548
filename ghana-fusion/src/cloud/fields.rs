//! Field descriptors for packed point cloud records.
//!
//! A [`RawCloud`](super::RawCloud) describes each per-point channel with a
//! [`CloudField`]: a name, an element type, and a byte offset into the
//! point record. This mirrors the self-describing layout used by common
//! sensor middlewares, which is exactly where the `rgb` declaration quirk
//! handled by [`normalize_color_field`] comes from.

use serde::{Deserialize, Serialize};

/// Name of the packed-float RGBA color field.
pub const COLOR_FIELD: &str = "rgb";

/// Element type of a point cloud field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl FieldType {
    /// Size of one element in bytes.
    #[inline]
    pub fn size(self) -> usize {
        match self {
            FieldType::Int8 | FieldType::Uint8 => 1,
            FieldType::Int16 | FieldType::Uint16 => 2,
            FieldType::Int32 | FieldType::Uint32 | FieldType::Float32 => 4,
            FieldType::Float64 => 8,
        }
    }
}

/// One per-point channel of a packed cloud.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudField {
    /// Channel name (`"x"`, `"y"`, `"z"`, `"rgb"`, ...).
    pub name: String,
    /// Declared element type.
    pub datatype: FieldType,
    /// Byte offset of the element within a point record.
    pub offset: usize,
}

impl CloudField {
    /// Create a field descriptor.
    pub fn new(name: &str, datatype: FieldType, offset: usize) -> Self {
        Self {
            name: name.to_string(),
            datatype,
            offset,
        }
    }
}

/// Correct the declared element type of the color field.
///
/// Several producers declare the `rgb` channel as an integer type while
/// packing the `0xAARRGGBB` bits into an IEEE-754 float slot. Decoding the
/// bytes under the declared integer type scrambles the channels, so the
/// descriptor is rewritten to `Float32` before any color bytes are
/// interpreted. Non-color fields pass through untouched.
///
/// Pure function: returns a corrected copy, never mutates shared input.
pub fn normalize_color_field(field: &CloudField) -> CloudField {
    if field.name == COLOR_FIELD && field.datatype != FieldType::Float32 {
        CloudField {
            datatype: FieldType::Float32,
            ..field.clone()
        }
    } else {
        field.clone()
    }
}
