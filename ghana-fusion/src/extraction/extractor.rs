//! Voxel walk over the volume producing visualization point clouds.
//!
//! Both extraction modes traverse identically (every allocated block in
//! enumeration order, every voxel position in a fixed triple-nested index
//! order) and differ only in the inclusion predicate and the emitted
//! attribute. Output ordering is therefore reproducible for a fixed volume
//! state.

use ghana_map::core::{GridIndex, Vec3};
use ghana_map::{TsdfVolume, TsdfVoxel};

use super::clouds::{ColorCloud, IntensityCloud};

/// Which voxels to emit, and with what attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractionMode {
    /// Every voxel observed at least once; emits signed distance as a
    /// scalar intensity. Diagnostic full-volume view.
    AllUpdated,
    /// Observed voxels within the surface band
    /// (|distance| < voxel_size × surface factor); emits voxel color.
    SurfaceOnly,
}

/// Fraction of the voxel edge length within which a voxel counts as
/// lying on the surface.
pub const DEFAULT_SURFACE_DISTANCE_FACTOR: f32 = 0.75;

/// Walks allocated blocks and emits voxels as point clouds.
#[derive(Clone, Debug)]
pub struct SurfaceExtractor {
    /// Frame id stamped onto every output cloud.
    world_frame: String,
    /// Surface band half-width as a fraction of the voxel size.
    surface_distance_factor: f32,
}

impl SurfaceExtractor {
    /// Create an extractor tagging outputs with `world_frame` and using the
    /// default surface band.
    pub fn new(world_frame: &str) -> Self {
        Self::with_surface_factor(world_frame, DEFAULT_SURFACE_DISTANCE_FACTOR)
    }

    /// Create an extractor with an explicit surface band factor.
    pub fn with_surface_factor(world_frame: &str, surface_distance_factor: f32) -> Self {
        Self {
            world_frame: world_frame.to_string(),
            surface_distance_factor,
        }
    }

    /// Frame id stamped onto output clouds
    #[inline]
    pub fn world_frame(&self) -> &str {
        &self.world_frame
    }

    /// Extract the full-volume intensity cloud ([`ExtractionMode::AllUpdated`]).
    ///
    /// Emits every voxel with weight > 0, intensity = signed distance.
    pub fn extract_all_updated(&self, volume: &TsdfVolume, stamp_us: u64) -> IntensityCloud {
        let capacity = volume.num_blocks() * volume.voxels_per_block();
        let mut cloud = IntensityCloud::with_capacity(&self.world_frame, stamp_us, capacity);

        self.walk(volume, |voxel, center| {
            if voxel.weight > 0.0 {
                cloud.push(center, voxel.distance);
            }
        });

        cloud
    }

    /// Extract the near-surface color cloud ([`ExtractionMode::SurfaceOnly`]).
    ///
    /// Emits voxels with weight > 0 whose |distance| is inside the surface
    /// band, carrying the voxel color.
    pub fn extract_surface(&self, volume: &TsdfVolume, stamp_us: u64) -> ColorCloud {
        let capacity = volume.num_blocks() * volume.voxels_per_block();
        let mut cloud = ColorCloud::with_capacity(&self.world_frame, stamp_us, capacity);
        let surface_distance = volume.voxel_size() * self.surface_distance_factor;

        self.walk(volume, |voxel, center| {
            if voxel.weight > 0.0 && voxel.distance.abs() < surface_distance {
                cloud.push(center, voxel.color);
            }
        });

        cloud
    }

    /// Positions that `extract(mode)` would emit; shared predicate logic
    /// exposed for callers that only need geometry.
    pub fn extract_positions(
        &self,
        volume: &TsdfVolume,
        mode: ExtractionMode,
        stamp_us: u64,
    ) -> Vec<Vec3> {
        match mode {
            ExtractionMode::AllUpdated => self.extract_all_updated(volume, stamp_us).points,
            ExtractionMode::SurfaceOnly => self.extract_surface(volume, stamp_us).points,
        }
    }

    /// Visit every voxel of every allocated block exactly once.
    ///
    /// Traversal order: blocks in volume enumeration order, then x, y, z
    /// index ranges nested outermost-to-innermost.
    fn walk<F>(&self, volume: &TsdfVolume, mut visit: F)
    where
        F: FnMut(TsdfVoxel, Vec3),
    {
        let side = volume.voxels_per_side() as i32;

        for (_index, block) in volume.blocks() {
            for x in 0..side {
                for y in 0..side {
                    for z in 0..side {
                        let voxel_index = GridIndex::new(x, y, z);
                        visit(block.voxel(voxel_index), block.voxel_center(voxel_index));
                    }
                }
            }
        }
    }
}
