//! Fixed-size cubic voxel block.
//!
//! Uses Structure-of-Arrays (SoA) layout: distances, weights, and colors are
//! stored in separate contiguous arrays indexed by the same linear voxel
//! index. This keeps the distance and weight scans of extraction
//! cache-friendly and auto-vectorizable.

use crate::core::{Rgba, Vec3, VoxelIndex};

/// A single voxel's stored state.
///
/// A voxel with `weight == 0.0` has never been observed; its distance and
/// color are meaningless and must be ignored by consumers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TsdfVoxel {
    /// Signed distance to the nearest observed surface, in meters.
    /// Positive in observed free space, negative behind the surface.
    pub distance: f32,
    /// Accumulated observation weight (0 = never observed).
    pub weight: f32,
    /// Accumulated surface color.
    pub color: Rgba,
}

impl Default for TsdfVoxel {
    fn default() -> Self {
        Self {
            distance: 0.0,
            weight: 0.0,
            color: Rgba::WHITE,
        }
    }
}

/// A cubic grid of `voxels_per_side³` voxels with SoA storage.
///
/// The block covers the axis-aligned cube starting at `origin` with edge
/// length `voxels_per_side * voxel_size`. Voxel `(x, y, z)` covers the cube
/// from `origin + (x, y, z) * voxel_size`, its center offset by half a
/// voxel on each axis.
#[derive(Clone, Debug)]
pub struct VoxelBlock {
    // === SoA data arrays ===
    distances: Vec<f32>,
    weights: Vec<f32>,
    colors: Vec<Rgba>,

    // === Block metadata ===
    /// World coordinates of the block's low corner
    origin: Vec3,
    /// Voxel edge length in meters
    voxel_size: f32,
    /// Voxels along each edge of the block
    voxels_per_side: usize,
}

impl VoxelBlock {
    /// Create an unobserved block at the given origin.
    pub fn new(origin: Vec3, voxel_size: f32, voxels_per_side: usize) -> Self {
        let count = voxels_per_side * voxels_per_side * voxels_per_side;
        Self {
            distances: vec![0.0; count],
            weights: vec![0.0; count],
            colors: vec![Rgba::WHITE; count],
            origin,
            voxel_size,
            voxels_per_side,
        }
    }

    /// World coordinates of the block's low corner
    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Voxel edge length in meters
    #[inline]
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Voxels along each edge
    #[inline]
    pub fn voxels_per_side(&self) -> usize {
        self.voxels_per_side
    }

    /// Total voxel count (`voxels_per_side³`)
    #[inline]
    pub fn num_voxels(&self) -> usize {
        self.distances.len()
    }

    /// Check if a voxel index lies within this block's grid
    #[inline]
    pub fn contains(&self, index: VoxelIndex) -> bool {
        let side = self.voxels_per_side as i32;
        (0..side).contains(&index.x) && (0..side).contains(&index.y) && (0..side).contains(&index.z)
    }

    /// Linear storage index for a voxel index.
    ///
    /// Layout is x-fastest: `x + vps * (y + vps * z)`.
    #[inline]
    fn linear_index(&self, index: VoxelIndex) -> usize {
        debug_assert!(self.contains(index), "voxel index out of block bounds");
        let vps = self.voxels_per_side;
        index.x as usize + vps * (index.y as usize + vps * index.z as usize)
    }

    /// Read a voxel's state.
    #[inline]
    pub fn voxel(&self, index: VoxelIndex) -> TsdfVoxel {
        let i = self.linear_index(index);
        TsdfVoxel {
            distance: self.distances[i],
            weight: self.weights[i],
            color: self.colors[i],
        }
    }

    /// Overwrite a voxel's state.
    #[inline]
    pub fn set_voxel(&mut self, index: VoxelIndex, voxel: TsdfVoxel) {
        let i = self.linear_index(index);
        self.distances[i] = voxel.distance;
        self.weights[i] = voxel.weight;
        self.colors[i] = voxel.color;
    }

    /// World coordinates of a voxel's center.
    #[inline]
    pub fn voxel_center(&self, index: VoxelIndex) -> Vec3 {
        Vec3::new(
            self.origin.x + (index.x as f32 + 0.5) * self.voxel_size,
            self.origin.y + (index.y as f32 + 0.5) * self.voxel_size,
            self.origin.z + (index.z as f32 + 0.5) * self.voxel_size,
        )
    }

    /// Number of voxels with a positive weight.
    pub fn observed_count(&self) -> usize {
        self.weights.iter().filter(|&&w| w > 0.0).count()
    }
}
