//! End-to-end pipeline tests: cloud arrival through pose resolution,
//! sanitization, integration, and extraction.

use crossbeam_channel::Receiver;

use ghana_fusion::{
    shared_transform_buffer, ChannelSink, ColorCloud, FusionError, FusionNode, IntensityCloud,
    NodeConfig, PoseResolution, RawCloud, SharedTransformBuffer,
};
use ghana_map::core::{Pose3D, Rgba, Vec3};
use ghana_map::{IntegratorConfig, VolumeConfig};

const VOXEL_SIZE: f32 = 0.05;

fn create_test_node() -> (
    FusionNode,
    SharedTransformBuffer,
    Receiver<ColorCloud>,
    Receiver<IntensityCloud>,
) {
    let transforms = shared_transform_buffer();
    let (sink, surface_rx, intensity_rx) = ChannelSink::new();
    let node = FusionNode::new(
        NodeConfig::default(),
        VolumeConfig {
            voxel_size: VOXEL_SIZE,
            voxels_per_side: 16,
        },
        IntegratorConfig {
            truncation_distance: 4.0 * VOXEL_SIZE,
            max_weight: 10_000.0,
        },
        transforms.clone(),
        Box::new(sink),
    );
    // Swallow the startup publication so tests see only their own cycles.
    let _ = surface_rx.try_recv();
    (node, transforms, surface_rx, intensity_rx)
}

/// A cloud with a single red point 1m ahead of the sensor.
fn single_red_point_cloud(stamp_us: u64) -> RawCloud {
    RawCloud::from_points(
        "lidar",
        stamp_us,
        &[(Vec3::new(1.0, 0.0, 0.0), Rgba::new(255, 0, 0))],
    )
}

#[test]
fn test_end_to_end_single_red_point() {
    let (mut node, transforms, surface_rx, _intensity_rx) = create_test_node();
    transforms
        .write()
        .insert("world", "lidar", 100, Pose3D::identity());

    node.on_cloud(&single_red_point_cloud(100)).unwrap();

    // The voxel nearest the observed point is allocated and observed.
    let voxel = node
        .volume()
        .voxel_at(Vec3::new(1.0, 0.0, 0.0))
        .expect("voxel at observed point allocated");
    assert!(voxel.weight > 0.0);

    // Within the surface band it must appear in the published surface
    // cloud, carrying the observed color.
    let surface = surface_rx.try_recv().unwrap();
    assert_eq!(surface.frame_id, "world");
    if voxel.distance.abs() < VOXEL_SIZE * 0.75 {
        let half_voxel = VOXEL_SIZE / 2.0 + 1e-5;
        let hit = surface
            .points
            .iter()
            .position(|p| {
                (p.x - 1.0).abs() <= half_voxel && p.y.abs() <= half_voxel && p.z.abs() <= half_voxel
            })
            .expect("surface output contains the observed voxel");
        let color = surface.colors[hit];
        assert_eq!((color.r, color.g, color.b), (255, 0, 0));
    }
}

#[test]
fn test_arrival_without_any_transform_has_no_effects() {
    let (mut node, _transforms, surface_rx, intensity_rx) = create_test_node();

    let err = node.on_cloud(&single_red_point_cloud(100)).unwrap_err();

    assert!(matches!(err, FusionError::TransformUnavailable { .. }));
    assert_eq!(node.volume().num_blocks(), 0);
    assert!(surface_rx.try_recv().is_err());
    assert!(intensity_rx.try_recv().is_err());
}

#[test]
fn test_fallback_pose_still_integrates() {
    let (mut node, transforms, surface_rx, _intensity_rx) = create_test_node();
    // Only an old sample exists; the arrival's timestamp cannot be served.
    transforms
        .write()
        .insert("world", "lidar", 100, Pose3D::from_translation(0.0, 1.0, 0.0));

    // The resolver reports the degraded path exactly once per lookup.
    let resolution = transforms.read().resolve("lidar", "world", 500).unwrap();
    assert!(resolution.is_fallback());
    assert!(matches!(resolution, PoseResolution::Fallback(_)));

    node.on_cloud(&single_red_point_cloud(500)).unwrap();

    // Integration used the latest transform: the point lands at (1, 1, 0).
    assert!(node.volume().voxel_at(Vec3::new(1.0, 1.0, 0.0)).is_some());
    assert!(!surface_rx.try_recv().unwrap().is_empty());
}

#[test]
fn test_surface_output_is_subset_of_all_updated() {
    let (mut node, transforms, _surface_rx, _intensity_rx) = create_test_node();
    transforms
        .write()
        .insert("world", "lidar", 100, Pose3D::identity());

    // A ring of colored points, like one revolution of a spinning sensor.
    let points: Vec<(Vec3, Rgba)> = (0..90)
        .map(|i| {
            let angle = i as f32 / 90.0 * std::f32::consts::TAU;
            (
                Vec3::new(1.5 * angle.cos(), 1.5 * angle.sin(), 0.1 * angle.sin()),
                Rgba::new(i as u8, 90 - i as u8, 128),
            )
        })
        .collect();
    node.on_cloud(&RawCloud::from_points("lidar", 100, &points))
        .unwrap();

    let extractor = ghana_fusion::SurfaceExtractor::new("world");
    let all = extractor.extract_all_updated(node.volume(), 100);
    let surface = extractor.extract_surface(node.volume(), 100);

    assert!(!all.is_empty());
    assert!(!surface.is_empty());
    assert!(surface.len() <= all.len());

    // Every surface point is one of the all-updated positions, and its
    // voxel honors the inclusion predicate.
    let threshold = VOXEL_SIZE * 0.75;
    for point in &surface.points {
        assert!(
            all.points.iter().any(|p| p.distance(point) < 1e-6),
            "surface point missing from all-updated output"
        );
        let voxel = node.volume().voxel_at(*point).unwrap();
        assert!(voxel.weight > 0.0);
        assert!(voxel.distance.abs() < threshold);
    }
}

#[test]
fn test_malformed_cloud_aborts_without_mutation() {
    let (mut node, transforms, surface_rx, _intensity_rx) = create_test_node();
    transforms
        .write()
        .insert("world", "lidar", 100, Pose3D::identity());

    let mut raw = single_red_point_cloud(100);
    raw.fields.retain(|f| f.name != "y");

    let err = node.on_cloud(&raw).unwrap_err();
    assert_eq!(err, FusionError::MissingField("y"));
    assert_eq!(node.volume().num_blocks(), 0);
    assert!(surface_rx.try_recv().is_err());
}

#[test]
fn test_repeated_arrivals_accumulate_one_map() {
    let (mut node, transforms, surface_rx, _intensity_rx) = create_test_node();
    transforms
        .write()
        .insert("world", "lidar", 100, Pose3D::identity());

    for stamp in [100, 110, 120] {
        node.on_cloud(&single_red_point_cloud(stamp)).unwrap();
    }

    // Same scene observed three times: same voxels, more weight.
    let voxel = node.volume().voxel_at(Vec3::new(1.0, 0.0, 0.0)).unwrap();
    assert_eq!(voxel.weight, 3.0);

    // One publication per cycle, each a fresh snapshot.
    let published: Vec<_> = surface_rx.try_iter().collect();
    assert_eq!(published.len(), 3);
    assert_eq!(published[0].len(), published[2].len());
}
