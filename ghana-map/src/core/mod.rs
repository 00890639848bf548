//! Foundation types shared by the volume storage and its consumers.

mod color;
mod point;
mod pose;

pub use color::Rgba;
pub use point::{BlockIndex, GridIndex, Vec3, VoxelIndex};
pub use pose::{Pose3D, Quaternion};
