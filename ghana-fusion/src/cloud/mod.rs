//! Point cloud ingestion: packed message type, field normalization, and
//! sanitization into clean parallel arrays.
//!
//! # Pipeline
//!
//! ```text
//! RawCloud → normalize_color_field (per field) → decode → strip NaN/Inf
//!          → SanitizedCloud (positions + colors, index-aligned)
//! ```

mod fields;
mod raw;
mod sanitizer;

pub use fields::{normalize_color_field, CloudField, FieldType, COLOR_FIELD};
pub use raw::RawCloud;
pub use sanitizer::{SanitizedCloud, Sanitizer};
