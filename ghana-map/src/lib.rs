//! # Ghana-Map: Voxelized Signed-Distance Map Library
//!
//! A sparse truncated-signed-distance (TSDF) volume for streaming 3D
//! reconstruction, designed as the map backend of a point cloud fusion
//! pipeline.
//!
//! ## Features
//!
//! - **Sparse block storage**: fixed-size cubic voxel blocks allocated on
//!   demand, enumerated in a deterministic order
//! - **SoA voxel layout**: distance/weight/color in separate contiguous
//!   arrays for cache-friendly scans
//! - **Projective integration**: a compact point-projective TSDF updater
//!   behind a narrow API, so consumers never touch fusion internals
//!
//! ## Quick Start
//!
//! ```rust
//! use ghana_map::{TsdfIntegrator, TsdfVolume, VolumeConfig};
//! use ghana_map::core::{Pose3D, Rgba, Vec3};
//!
//! let mut volume = TsdfVolume::new(VolumeConfig::default());
//! let integrator = TsdfIntegrator::default();
//!
//! // Fold one red point, observed 1m ahead of the sensor, into the map.
//! integrator.integrate(
//!     &mut volume,
//!     &Pose3D::identity(),
//!     &[Vec3::new(1.0, 0.0, 0.0)],
//!     &[Rgba::new(255, 0, 0)],
//! );
//! assert!(volume.num_blocks() > 0);
//! ```
//!
//! ## Coordinate Frame
//!
//! All coordinates follow the ROS REP-103 convention: X-forward, Y-left,
//! Z-up, right-handed. Block `(0, 0, 0)` has its low corner at the world
//! origin; block indices extend over the full signed integer grid.
//!
//! ## Data Flow
//!
//! ```text
//! sensor points + pose ──► TsdfIntegrator ──► TsdfVolume
//!                                                │
//!                                                ▼
//!                                    block / voxel accessors
//!                                    (distance, weight, color,
//!                                     world-coordinate reconstruction)
//! ```

pub mod core;

mod block;
mod integrator;
mod volume;

pub use block::{TsdfVoxel, VoxelBlock};
pub use integrator::{IntegrationResult, IntegratorConfig, TsdfIntegrator};
pub use volume::{TsdfVolume, VolumeConfig};
