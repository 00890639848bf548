//! # Ghana-Fusion: streaming point cloud fusion node
//!
//! Ingests colored 3D point clouds with a time-varying sensor pose,
//! accumulates them into a voxelized signed-distance volume
//! ([`ghana_map`]), and extracts a colored surface point cloud after every
//! cycle.
//!
//! # Architecture
//!
//! The crate is organized into 5 logical layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      main                           │  ← Daemon binary
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                     node/                           │  ← Orchestration
//! │          (fusion cycle, worker thread, sinks)       │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                  extraction/                        │  ← Volume walk
//! │        (surface / full-volume cloud output)         │
//! └─────────────────────────────────────────────────────┘
//!                          │
//! ┌──────────────────────────┬──────────────────────────┐
//! │         cloud/           │          pose/           │  ← Input handling
//! │  (decode + sanitize)     │  (timed TF resolution)   │
//! └──────────────────────────┴──────────────────────────┘
//!                          │
//! ┌─────────────────────────────────────────────────────┐
//! │                   ghana-map                         │  ← Volume backend
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Processing cycle
//!
//! Every arrival runs to completion before the next is accepted:
//!
//! 1. **Pose resolution**: sensor-to-world at the cloud's timestamp, with a
//!    warned latest-transform fallback; an unresolvable pose drops the
//!    cycle with no side effects.
//! 2. **Sanitization**: color field declaration corrected, non-finite
//!    points stripped in lock-step with their colors.
//! 3. **Integration**: sanitized points folded into the TSDF volume.
//! 4. **Extraction and publication**: near-surface color cloud every cycle;
//!    full-volume intensity cloud behind a config toggle.

pub mod cloud;
pub mod config;
pub mod error;
pub mod extraction;
pub mod node;
pub mod pose;

// Core message and result types
pub use cloud::{RawCloud, SanitizedCloud, Sanitizer};
pub use error::{FusionError, Result};

// Pose resolution
pub use pose::{shared_transform_buffer, PoseResolution, SharedTransformBuffer, TransformBuffer};

// Extraction
pub use extraction::{ColorCloud, ExtractionMode, IntensityCloud, SurfaceExtractor};

// Orchestration
pub use node::{ChannelSink, CloudSink, FusionNode, FusionThread, NodeConfig, NodeState};

// Configuration
pub use config::Config;
