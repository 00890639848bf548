//! Sparse voxel volume: blocks allocated on demand, indexed by block index.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::block::{TsdfVoxel, VoxelBlock};
use crate::core::{BlockIndex, GridIndex, Vec3, VoxelIndex};

/// Volume geometry, fixed at construction.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Voxel edge length in meters.
    pub voxel_size: f32,
    /// Voxels along each edge of a block.
    pub voxels_per_side: usize,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            voxel_size: 0.02,
            voxels_per_side: 16,
        }
    }
}

/// Sparse truncated-signed-distance volume.
///
/// Storage is a `BTreeMap` keyed by block index, so block enumeration is
/// deterministic (ascending index order) for a fixed volume state and
/// callers that walk the volume produce reproducible output.
#[derive(Debug, Clone)]
pub struct TsdfVolume {
    blocks: BTreeMap<BlockIndex, VoxelBlock>,
    voxel_size: f32,
    voxels_per_side: usize,
    block_size: f32,
}

impl TsdfVolume {
    /// Create an empty volume.
    ///
    /// `voxel_size` must be positive and `voxels_per_side` at least 1.
    pub fn new(config: VolumeConfig) -> Self {
        assert!(config.voxel_size > 0.0, "voxel_size must be positive");
        assert!(config.voxels_per_side >= 1, "voxels_per_side must be >= 1");
        Self {
            blocks: BTreeMap::new(),
            voxel_size: config.voxel_size,
            voxels_per_side: config.voxels_per_side,
            block_size: config.voxel_size * config.voxels_per_side as f32,
        }
    }

    /// Voxel edge length in meters
    #[inline]
    pub fn voxel_size(&self) -> f32 {
        self.voxel_size
    }

    /// Voxels along each edge of a block
    #[inline]
    pub fn voxels_per_side(&self) -> usize {
        self.voxels_per_side
    }

    /// Total voxels per block (`voxels_per_side³`)
    #[inline]
    pub fn voxels_per_block(&self) -> usize {
        self.voxels_per_side * self.voxels_per_side * self.voxels_per_side
    }

    /// Block edge length in meters
    #[inline]
    pub fn block_size(&self) -> f32 {
        self.block_size
    }

    /// Number of allocated blocks
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// True when no block has been allocated yet
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Iterate over allocated blocks in ascending block-index order.
    pub fn blocks(&self) -> impl Iterator<Item = (&BlockIndex, &VoxelBlock)> {
        self.blocks.iter()
    }

    /// Get an allocated block, if present.
    #[inline]
    pub fn block(&self, index: BlockIndex) -> Option<&VoxelBlock> {
        self.blocks.get(&index)
    }

    /// World coordinates of a block's low corner.
    #[inline]
    pub fn block_origin(&self, index: BlockIndex) -> Vec3 {
        Vec3::new(
            index.x as f32 * self.block_size,
            index.y as f32 * self.block_size,
            index.z as f32 * self.block_size,
        )
    }

    /// Index of the block containing a world point.
    #[inline]
    pub fn block_index_of(&self, point: Vec3) -> BlockIndex {
        GridIndex::new(
            (point.x / self.block_size).floor() as i32,
            (point.y / self.block_size).floor() as i32,
            (point.z / self.block_size).floor() as i32,
        )
    }

    /// Global voxel index (unbounded grid over all blocks) of a world point.
    #[inline]
    pub fn global_voxel_of(&self, point: Vec3) -> GridIndex {
        GridIndex::new(
            (point.x / self.voxel_size).floor() as i32,
            (point.y / self.voxel_size).floor() as i32,
            (point.z / self.voxel_size).floor() as i32,
        )
    }

    /// Split a global voxel index into (block index, voxel-in-block index).
    #[inline]
    pub fn split_global(&self, global: GridIndex) -> (BlockIndex, VoxelIndex) {
        let vps = self.voxels_per_side as i32;
        let block = GridIndex::new(
            global.x.div_euclid(vps),
            global.y.div_euclid(vps),
            global.z.div_euclid(vps),
        );
        let voxel = GridIndex::new(
            global.x.rem_euclid(vps),
            global.y.rem_euclid(vps),
            global.z.rem_euclid(vps),
        );
        (block, voxel)
    }

    /// Get or allocate the block at an index.
    ///
    /// Allocation is idempotent: an existing block is returned untouched.
    pub fn allocate_block(&mut self, index: BlockIndex) -> &mut VoxelBlock {
        let origin = self.block_origin(index);
        let voxel_size = self.voxel_size;
        let vps = self.voxels_per_side;
        self.blocks
            .entry(index)
            .or_insert_with(|| VoxelBlock::new(origin, voxel_size, vps))
    }

    /// Read the voxel containing a world point, if its block is allocated.
    pub fn voxel_at(&self, point: Vec3) -> Option<TsdfVoxel> {
        let (block_idx, voxel_idx) = self.split_global(self.global_voxel_of(point));
        self.blocks.get(&block_idx).map(|b| b.voxel(voxel_idx))
    }

    /// Overwrite the voxel at a global voxel index, allocating its block.
    pub fn set_global_voxel(&mut self, global: GridIndex, voxel: TsdfVoxel) {
        let (block_idx, voxel_idx) = self.split_global(global);
        self.allocate_block(block_idx).set_voxel(voxel_idx, voxel);
    }

    /// Remove all blocks.
    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}
