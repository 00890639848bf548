//! Pose resolution: timed transform storage and frame-to-frame lookup with
//! an explicit latest-transform fallback.

mod buffer;

pub use buffer::{
    shared_transform_buffer, PoseResolution, SharedTransformBuffer, StampedPose, TransformBuffer,
};
