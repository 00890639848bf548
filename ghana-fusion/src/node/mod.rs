//! Integration orchestrator: one cloud arrival in, one fused-and-published
//! cycle out.
//!
//! Per arrival, strictly in order:
//! 1. resolve the sensor→world pose (abort the cycle if unavailable)
//! 2. sanitize the raw cloud
//! 3. integrate into the volume
//! 4. extract and publish
//!
//! Cycles never interleave; the node is owned by a single worker.

mod sink;
mod thread;

pub use sink::{ChannelSink, CloudSink};
pub use thread::FusionThread;

use ghana_map::{IntegratorConfig, TsdfIntegrator, TsdfVolume, VolumeConfig};

use crate::cloud::{RawCloud, Sanitizer};
use crate::error::Result;
use crate::extraction::{SurfaceExtractor, DEFAULT_SURFACE_DISTANCE_FACTOR};
use crate::pose::SharedTransformBuffer;

/// Orchestrator settings, fixed at startup.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Fixed world frame all output is attributed to.
    pub world_frame: String,
    /// Surface band half-width as a fraction of the voxel size.
    pub surface_distance_factor: f32,
    /// Publish the full-volume intensity cloud each cycle. Diagnostic;
    /// off by default, and the intensity cloud is not even computed
    /// while disabled.
    pub publish_all_updated: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            world_frame: "world".to_string(),
            surface_distance_factor: DEFAULT_SURFACE_DISTANCE_FACTOR,
            publish_all_updated: false,
        }
    }
}

/// Operational state of the node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Waiting for the next cloud arrival.
    Idle,
    /// A cloud arrival is being processed to completion.
    Processing,
}

/// The fusion node: owns the volume, drives one full cycle per arrival.
pub struct FusionNode {
    config: NodeConfig,
    volume: TsdfVolume,
    integrator: TsdfIntegrator,
    sanitizer: Sanitizer,
    extractor: SurfaceExtractor,
    transforms: SharedTransformBuffer,
    sink: Box<dyn CloudSink>,
    state: NodeState,
}

impl FusionNode {
    /// Create a node and publish the initial (empty) surface cloud.
    pub fn new(
        config: NodeConfig,
        volume_config: VolumeConfig,
        integrator_config: IntegratorConfig,
        transforms: SharedTransformBuffer,
        sink: Box<dyn CloudSink>,
    ) -> Self {
        let extractor =
            SurfaceExtractor::with_surface_factor(&config.world_frame, config.surface_distance_factor);
        let node = Self {
            config,
            volume: TsdfVolume::new(volume_config),
            integrator: TsdfIntegrator::new(integrator_config),
            sanitizer: Sanitizer::new(),
            extractor,
            transforms,
            sink,
            state: NodeState::Idle,
        };
        // Surface output is available from the very first moment, even
        // before any cloud has arrived.
        node.sink
            .publish_surface(node.extractor.extract_surface(&node.volume, 0));
        node
    }

    /// Current operational state
    #[inline]
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// The volume accumulated so far
    #[inline]
    pub fn volume(&self) -> &TsdfVolume {
        &self.volume
    }

    /// Process one cloud arrival to completion.
    ///
    /// On error the cycle has had no side effects: the volume is untouched
    /// and nothing is published. Errors are reported to the caller and the
    /// node stays usable for the next arrival.
    pub fn on_cloud(&mut self, raw: &RawCloud) -> Result<()> {
        self.state = NodeState::Processing;
        let result = self.process(raw);
        self.state = NodeState::Idle;
        result
    }

    fn process(&mut self, raw: &RawCloud) -> Result<()> {
        // 1. Pose. Failure aborts before any mutation.
        let resolution = {
            let transforms = self.transforms.read();
            transforms.resolve(&raw.frame_id, &self.config.world_frame, raw.stamp_us)
        };
        let resolution = match resolution {
            Ok(resolution) => resolution,
            Err(err) => {
                log::error!("dropping cloud from '{}': {}", raw.frame_id, err);
                return Err(err);
            }
        };
        if resolution.is_fallback() {
            log::warn!(
                "using latest transform instead of timestamp match for '{}' at {}us",
                raw.frame_id,
                raw.stamp_us
            );
        }
        let pose = resolution.pose();

        // 2. Sanitize. A malformed cloud aborts, an empty one does not.
        let cloud = match self.sanitizer.apply(raw) {
            Ok(cloud) => cloud,
            Err(err) => {
                log::error!("rejecting cloud from '{}': {}", raw.frame_id, err);
                return Err(err);
            }
        };

        // 3. Integrate.
        let stats = self
            .integrator
            .integrate(&mut self.volume, &pose, &cloud.points, &cloud.colors);
        log::info!(
            "integrated {} points, volume has {} blocks",
            stats.points_integrated,
            self.volume.num_blocks()
        );

        // 4. Extract and publish.
        self.sink
            .publish_surface(self.extractor.extract_surface(&self.volume, raw.stamp_us));
        if self.config.publish_all_updated {
            self.sink
                .publish_all_updated(self.extractor.extract_all_updated(&self.volume, raw.stamp_us));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::RawCloud;
    use crate::error::FusionError;
    use crate::pose::shared_transform_buffer;
    use ghana_map::core::{Pose3D, Rgba, Vec3};

    fn test_node(
        config: NodeConfig,
    ) -> (
        FusionNode,
        SharedTransformBuffer,
        crossbeam_channel::Receiver<crate::extraction::ColorCloud>,
        crossbeam_channel::Receiver<crate::extraction::IntensityCloud>,
    ) {
        let transforms = shared_transform_buffer();
        let (sink, surface_rx, intensity_rx) = ChannelSink::new();
        let node = FusionNode::new(
            config,
            VolumeConfig {
                voxel_size: 0.05,
                voxels_per_side: 8,
            },
            IntegratorConfig::default(),
            transforms.clone(),
            Box::new(sink),
        );
        (node, transforms, surface_rx, intensity_rx)
    }

    fn red_point_cloud(stamp_us: u64) -> RawCloud {
        RawCloud::from_points(
            "lidar",
            stamp_us,
            &[(Vec3::new(1.0, 0.0, 0.0), Rgba::new(255, 0, 0))],
        )
    }

    #[test]
    fn test_startup_publishes_empty_surface() {
        let (_node, _tf, surface_rx, _intensity_rx) = test_node(NodeConfig::default());
        let startup = surface_rx.try_recv().unwrap();
        assert!(startup.is_empty());
        assert_eq!(startup.frame_id, "world");
    }

    #[test]
    fn test_cycle_integrates_and_publishes() {
        let (mut node, transforms, surface_rx, _intensity_rx) = test_node(NodeConfig::default());
        let _ = surface_rx.try_recv(); // startup cloud

        transforms
            .write()
            .insert("world", "lidar", 100, Pose3D::identity());

        node.on_cloud(&red_point_cloud(100)).unwrap();

        assert!(node.volume().num_blocks() > 0);
        let published = surface_rx.try_recv().unwrap();
        assert_eq!(published.stamp_us, 100);
        assert_eq!(node.state(), NodeState::Idle);
    }

    #[test]
    fn test_unresolvable_pose_has_no_side_effects() {
        let (mut node, _tf, surface_rx, _intensity_rx) = test_node(NodeConfig::default());
        let _ = surface_rx.try_recv(); // startup cloud

        let err = node.on_cloud(&red_point_cloud(100)).unwrap_err();
        assert!(matches!(err, FusionError::TransformUnavailable { .. }));
        assert_eq!(node.volume().num_blocks(), 0);
        assert!(surface_rx.try_recv().is_err(), "nothing published on abort");
    }

    #[test]
    fn test_intensity_channel_gated_by_config() {
        let (mut node, transforms, _surface_rx, intensity_rx) = test_node(NodeConfig::default());
        transforms
            .write()
            .insert("world", "lidar", 100, Pose3D::identity());
        node.on_cloud(&red_point_cloud(100)).unwrap();
        assert!(intensity_rx.try_recv().is_err(), "disabled by default");

        let (mut node, transforms, _surface_rx, intensity_rx) = test_node(NodeConfig {
            publish_all_updated: true,
            ..NodeConfig::default()
        });
        transforms
            .write()
            .insert("world", "lidar", 100, Pose3D::identity());
        node.on_cloud(&red_point_cloud(100)).unwrap();
        let intensity = intensity_rx.try_recv().unwrap();
        assert!(!intensity.is_empty());
    }

    #[test]
    fn test_empty_cloud_still_extracts() {
        let (mut node, transforms, surface_rx, _intensity_rx) = test_node(NodeConfig::default());
        let _ = surface_rx.try_recv();

        transforms
            .write()
            .insert("world", "lidar", 100, Pose3D::identity());

        // Seed the volume with one observation first.
        node.on_cloud(&red_point_cloud(100)).unwrap();
        let _ = surface_rx.try_recv();
        let blocks_before = node.volume().num_blocks();

        // An empty arrival integrates nothing but still publishes the
        // current surface.
        node.on_cloud(&RawCloud::empty("lidar", 150)).unwrap();
        assert_eq!(node.volume().num_blocks(), blocks_before);
        let published = surface_rx.try_recv().unwrap();
        assert_eq!(published.stamp_us, 150);
    }
}
