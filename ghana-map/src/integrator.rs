//! Point-projective TSDF update.
//!
//! For each observed point the integrator visits the voxels inside the
//! truncation band around the surface endpoint and folds the projective
//! signed distance into each voxel as a weighted running average:
//! - distance is the component of (endpoint - voxel center) along the
//!   sensor ray, clamped to ±truncation_distance
//! - weight grows by one observation per update, saturating at max_weight
//! - color is blended in weight proportion

use serde::Deserialize;

use crate::block::TsdfVoxel;
use crate::core::{GridIndex, Pose3D, Rgba, Vec3};
use crate::volume::TsdfVolume;

/// Integrator tuning.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct IntegratorConfig {
    /// Half-width of the band around an observed surface point inside which
    /// voxels are updated, in meters. Typically a few voxel edge lengths.
    pub truncation_distance: f32,
    /// Upper bound on accumulated voxel weight. Caps the inertia of old
    /// observations so a long-lived map can still adapt.
    pub max_weight: f32,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            truncation_distance: 0.08,
            max_weight: 10_000.0,
        }
    }
}

/// Statistics for a single integration call.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrationResult {
    /// Points folded into the volume.
    pub points_integrated: usize,
    /// Points skipped (degenerate ray: endpoint coincides with the sensor).
    pub points_skipped: usize,
    /// Voxel updates performed.
    pub voxels_updated: usize,
    /// Blocks newly allocated by this call.
    pub blocks_allocated: usize,
}

/// Folds observed points into a [`TsdfVolume`].
#[derive(Debug, Clone)]
pub struct TsdfIntegrator {
    config: IntegratorConfig,
}

impl TsdfIntegrator {
    /// Create an integrator with the given tuning.
    pub fn new(config: IntegratorConfig) -> Self {
        Self { config }
    }

    /// Truncation band half-width in meters
    #[inline]
    pub fn truncation_distance(&self) -> f32 {
        self.config.truncation_distance
    }

    /// Integrate a batch of sensor-frame points into the volume.
    ///
    /// `pose` maps sensor frame to the volume's world frame. `points` and
    /// `colors` are index-aligned; both empty is a no-op. Blocks are
    /// allocated on demand.
    pub fn integrate(
        &self,
        volume: &mut TsdfVolume,
        pose: &Pose3D,
        points: &[Vec3],
        colors: &[Rgba],
    ) -> IntegrationResult {
        debug_assert_eq!(points.len(), colors.len(), "points/colors length mismatch");

        let mut result = IntegrationResult::default();
        let blocks_before = volume.num_blocks();
        let sensor_origin = pose.translation;
        let truncation = self.config.truncation_distance;

        for (point, color) in points.iter().zip(colors.iter()) {
            let endpoint = pose.transform_point(*point);

            let ray = endpoint - sensor_origin;
            let ray_length = ray.length();
            if ray_length <= f32::EPSILON {
                result.points_skipped += 1;
                continue;
            }
            let ray_dir = ray * (1.0 / ray_length);

            result.voxels_updated +=
                self.update_band(volume, sensor_origin, endpoint, ray_dir, *color, truncation);
            result.points_integrated += 1;
        }

        result.blocks_allocated = volume.num_blocks() - blocks_before;
        if result.points_integrated > 0 {
            log::debug!(
                "integrated {} points ({} voxel updates, {} new blocks)",
                result.points_integrated,
                result.voxels_updated,
                result.blocks_allocated
            );
        }
        result
    }

    /// Update every voxel whose center lies inside the truncation band
    /// around `endpoint`. Returns the number of voxels touched.
    fn update_band(
        &self,
        volume: &mut TsdfVolume,
        sensor_origin: Vec3,
        endpoint: Vec3,
        ray_dir: Vec3,
        color: Rgba,
        truncation: f32,
    ) -> usize {
        let lo = volume.global_voxel_of(endpoint - Vec3::new(truncation, truncation, truncation));
        let hi = volume.global_voxel_of(endpoint + Vec3::new(truncation, truncation, truncation));

        let mut updated = 0;
        for gz in lo.z..=hi.z {
            for gy in lo.y..=hi.y {
                for gx in lo.x..=hi.x {
                    let global = GridIndex::new(gx, gy, gz);
                    let (block_idx, voxel_idx) = volume.split_global(global);

                    // Center can be computed without allocating the block.
                    let center = Vec3::new(
                        (gx as f32 + 0.5) * volume.voxel_size(),
                        (gy as f32 + 0.5) * volume.voxel_size(),
                        (gz as f32 + 0.5) * volume.voxel_size(),
                    );

                    // Projective signed distance along the sensor ray:
                    // positive between sensor and surface, negative behind.
                    let sdf = (endpoint - center).dot(&ray_dir);
                    if sdf.abs() > truncation {
                        continue;
                    }

                    // Voxels behind the sensor are never observed.
                    if (center - sensor_origin).dot(&ray_dir) < 0.0 {
                        continue;
                    }

                    let block = volume.allocate_block(block_idx);
                    let voxel = block.voxel(voxel_idx);
                    block.set_voxel(voxel_idx, Self::fuse(voxel, sdf, color, self.config.max_weight));
                    updated += 1;
                }
            }
        }
        updated
    }

    /// Fold one observation into a voxel.
    fn fuse(voxel: TsdfVoxel, sdf: f32, color: Rgba, max_weight: f32) -> TsdfVoxel {
        const OBSERVATION_WEIGHT: f32 = 1.0;

        let new_weight = (voxel.weight + OBSERVATION_WEIGHT).min(max_weight);
        let distance =
            (voxel.distance * voxel.weight + sdf * OBSERVATION_WEIGHT) / (voxel.weight + OBSERVATION_WEIGHT);
        TsdfVoxel {
            distance,
            weight: new_weight,
            color: voxel.color.blend(voxel.weight, color, OBSERVATION_WEIGHT),
        }
    }
}

impl Default for TsdfIntegrator {
    fn default() -> Self {
        Self::new(IntegratorConfig::default())
    }
}
