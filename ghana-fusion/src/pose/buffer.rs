//! Time-indexed transform buffer with chained frame lookup.
//!
//! Stores a bounded history of stamped rigid transforms per directed
//! `(parent, child)` frame pair and resolves the transform between any two
//! connected frames at a requested timestamp. Edges compose along the
//! shortest chain (BFS); traversing an edge child→parent applies its
//! inverse.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;

use ghana_map::core::Pose3D;

use crate::error::{FusionError, Result};

/// A transform sample at a point in time.
#[derive(Clone, Copy, Debug)]
pub struct StampedPose {
    /// Sample timestamp in microseconds.
    pub stamp_us: u64,
    /// Pose of the child frame in the parent frame.
    pub pose: Pose3D,
}

/// Outcome of a successful pose resolution.
///
/// `Fallback` means the requested timestamp could not be served by every
/// edge on the chain and the latest available samples were used instead;
/// callers surface this so operators can detect synchronization drift.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PoseResolution {
    /// Every edge interpolated the requested timestamp.
    Exact(Pose3D),
    /// Latest-available samples substituted for the requested timestamp.
    Fallback(Pose3D),
}

impl PoseResolution {
    /// The resolved pose, regardless of how it was obtained.
    #[inline]
    pub fn pose(&self) -> Pose3D {
        match self {
            PoseResolution::Exact(pose) | PoseResolution::Fallback(pose) => *pose,
        }
    }

    /// True when the latest-transform fallback was taken.
    #[inline]
    pub fn is_fallback(&self) -> bool {
        matches!(self, PoseResolution::Fallback(_))
    }
}

type EdgeKey = (String, String);

/// One BFS step along the chain: which edge, and whether it is traversed
/// against its stored direction.
#[derive(Clone, Debug)]
struct ChainStep {
    key: EdgeKey,
    inverted: bool,
}

/// Directed graph of frames with a time history per edge.
#[derive(Debug, Default)]
pub struct TransformBuffer {
    /// `(parent, child)` → samples sorted by ascending timestamp.
    edges: HashMap<EdgeKey, Vec<StampedPose>>,
    /// History cap per edge; oldest samples are evicted first.
    max_samples_per_edge: usize,
}

/// Default per-edge history length.
const DEFAULT_EDGE_HISTORY: usize = 512;

impl TransformBuffer {
    /// Create an empty buffer with the default history length.
    pub fn new() -> Self {
        Self::with_history(DEFAULT_EDGE_HISTORY)
    }

    /// Create an empty buffer keeping at most `max_samples_per_edge`
    /// samples per frame pair.
    pub fn with_history(max_samples_per_edge: usize) -> Self {
        Self {
            edges: HashMap::new(),
            max_samples_per_edge: max_samples_per_edge.max(1),
        }
    }

    /// Register a stamped transform of `child` relative to `parent`.
    ///
    /// Out-of-order timestamps are accepted and kept sorted.
    pub fn insert(&mut self, parent: &str, child: &str, stamp_us: u64, pose: Pose3D) {
        let samples = self
            .edges
            .entry((parent.to_string(), child.to_string()))
            .or_default();

        let position = samples.partition_point(|s| s.stamp_us <= stamp_us);
        samples.insert(position, StampedPose { stamp_us, pose });

        if samples.len() > self.max_samples_per_edge {
            let excess = samples.len() - self.max_samples_per_edge;
            samples.drain(..excess);
        }
    }

    /// True when a chain of edges connects the two frames.
    pub fn can_resolve(&self, from: &str, to: &str) -> bool {
        from == to || self.find_chain(from, to).is_some()
    }

    /// Resolve the transform mapping points in `from` into `to` at the
    /// requested timestamp.
    ///
    /// Attempts an exact (interpolated) lookup on every edge of the chain
    /// first; if any edge cannot serve the timestamp, falls back to each
    /// edge's latest sample. Fails with
    /// [`FusionError::TransformUnavailable`] when no chain exists.
    pub fn resolve(&self, from: &str, to: &str, stamp_us: u64) -> Result<PoseResolution> {
        if from == to {
            return Ok(PoseResolution::Exact(Pose3D::identity()));
        }

        let chain = self
            .find_chain(from, to)
            .ok_or_else(|| FusionError::TransformUnavailable {
                from: from.to_string(),
                to: to.to_string(),
            })?;

        if let Some(pose) = self.compose_chain(&chain, |samples| Self::sample_at(samples, stamp_us))
        {
            return Ok(PoseResolution::Exact(pose));
        }

        let pose = self
            .compose_chain(&chain, |samples| samples.last().map(|s| s.pose))
            .expect("chain edges always hold at least one sample");
        Ok(PoseResolution::Fallback(pose))
    }

    /// Compose the chain using `lookup` to pick each edge's pose.
    /// Returns `None` as soon as any edge lookup fails.
    fn compose_chain<F>(&self, chain: &[ChainStep], lookup: F) -> Option<Pose3D>
    where
        F: Fn(&[StampedPose]) -> Option<Pose3D>,
    {
        let mut acc = Pose3D::identity();
        for step in chain {
            let samples = self.edges.get(&step.key)?;
            let pose = lookup(samples)?;
            let pose = if step.inverted { pose.inverse() } else { pose };
            acc = pose.compose(&acc);
        }
        Some(acc)
    }

    /// Interpolate an edge's pose at a timestamp.
    ///
    /// Returns `None` outside the sampled interval: no extrapolation, so
    /// a stale history is reported as degraded rather than guessed.
    fn sample_at(samples: &[StampedPose], stamp_us: u64) -> Option<Pose3D> {
        let first = samples.first()?;
        let last = samples.last()?;
        if stamp_us < first.stamp_us || stamp_us > last.stamp_us {
            return None;
        }

        let upper = samples.partition_point(|s| s.stamp_us < stamp_us);
        let hi = &samples[upper.min(samples.len() - 1)];
        if hi.stamp_us == stamp_us || upper == 0 {
            return Some(hi.pose);
        }

        let lo = &samples[upper - 1];
        let span = (hi.stamp_us - lo.stamp_us) as f32;
        let t = if span > 0.0 {
            (stamp_us - lo.stamp_us) as f32 / span
        } else {
            1.0
        };
        Some(lo.pose.interpolate(&hi.pose, t))
    }

    /// BFS over the frame graph; edges are traversable in both directions.
    fn find_chain(&self, from: &str, to: &str) -> Option<Vec<ChainStep>> {
        let mut adjacency: HashMap<&str, Vec<(&str, &EdgeKey, bool)>> = HashMap::new();
        for key in self.edges.keys() {
            let (parent, child) = key;
            // Forward traversal child→parent applies the stored pose;
            // parent→child applies its inverse.
            adjacency
                .entry(child.as_str())
                .or_default()
                .push((parent.as_str(), key, false));
            adjacency
                .entry(parent.as_str())
                .or_default()
                .push((child.as_str(), key, true));
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut came_from: HashMap<&str, (&str, &EdgeKey, bool)> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        visited.insert(from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            if current == to {
                // Walk predecessors back to the start, then reverse.
                let mut chain = Vec::new();
                let mut frame = current;
                while frame != from {
                    let (prev, key, inverted) = came_from[frame];
                    chain.push(ChainStep {
                        key: key.clone(),
                        inverted,
                    });
                    frame = prev;
                }
                chain.reverse();
                return Some(chain);
            }

            if let Some(neighbors) = adjacency.get(current) {
                for &(next, key, inverted) in neighbors {
                    if visited.insert(next) {
                        came_from.insert(next, (current, key, inverted));
                        queue.push_back(next);
                    }
                }
            }
        }

        None
    }
}

/// Shared handle to a transform buffer, written by the pose source and read
/// by the fusion worker.
pub type SharedTransformBuffer = Arc<RwLock<TransformBuffer>>;

/// Create a shared, empty transform buffer.
pub fn shared_transform_buffer() -> SharedTransformBuffer {
    Arc::new(RwLock::new(TransformBuffer::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghana_map::core::{Quaternion, Vec3};
    use std::f32::consts::FRAC_PI_2;

    fn translation(x: f32, y: f32, z: f32) -> Pose3D {
        Pose3D::from_translation(x, y, z)
    }

    #[test]
    fn test_same_frame_is_exact_identity() {
        let buffer = TransformBuffer::new();
        let resolved = buffer.resolve("world", "world", 100).unwrap();
        assert_eq!(resolved, PoseResolution::Exact(Pose3D::identity()));
    }

    #[test]
    fn test_no_chain_is_unavailable() {
        let mut buffer = TransformBuffer::new();
        buffer.insert("world", "base", 100, translation(1.0, 0.0, 0.0));

        let err = buffer.resolve("lidar", "world", 100).unwrap_err();
        assert_eq!(
            err,
            FusionError::TransformUnavailable {
                from: "lidar".to_string(),
                to: "world".to_string(),
            }
        );
        assert!(!buffer.can_resolve("lidar", "world"));
    }

    #[test]
    fn test_exact_lookup_at_sample_time() {
        let mut buffer = TransformBuffer::new();
        buffer.insert("world", "lidar", 100, translation(1.0, 2.0, 3.0));

        // child → parent: stored pose applies directly.
        let resolved = buffer.resolve("lidar", "world", 100).unwrap();
        assert!(!resolved.is_fallback());
        assert!(resolved.pose().approx_eq(&translation(1.0, 2.0, 3.0), 1e-5));
    }

    #[test]
    fn test_parent_to_child_applies_inverse() {
        let mut buffer = TransformBuffer::new();
        buffer.insert("world", "lidar", 100, translation(1.0, 0.0, 0.0));

        let resolved = buffer.resolve("world", "lidar", 100).unwrap();
        assert!(resolved.pose().approx_eq(&translation(-1.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_interpolates_between_samples() {
        let mut buffer = TransformBuffer::new();
        buffer.insert("world", "lidar", 100, translation(0.0, 0.0, 0.0));
        buffer.insert("world", "lidar", 200, translation(2.0, 0.0, 0.0));

        let resolved = buffer.resolve("lidar", "world", 150).unwrap();
        assert!(!resolved.is_fallback());
        assert!(resolved.pose().approx_eq(&translation(1.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_timestamp_outside_history_falls_back_to_latest() {
        let mut buffer = TransformBuffer::new();
        buffer.insert("world", "lidar", 100, translation(1.0, 0.0, 0.0));
        buffer.insert("world", "lidar", 200, translation(5.0, 0.0, 0.0));

        // Requested time is after the newest sample.
        let resolved = buffer.resolve("lidar", "world", 300).unwrap();
        assert!(resolved.is_fallback());
        assert!(resolved.pose().approx_eq(&translation(5.0, 0.0, 0.0), 1e-5));

        // And before the oldest.
        let resolved = buffer.resolve("lidar", "world", 50).unwrap();
        assert!(resolved.is_fallback());
    }

    #[test]
    fn test_chain_composition_across_frames() {
        let mut buffer = TransformBuffer::new();
        buffer.insert("world", "base", 100, translation(1.0, 0.0, 0.0));
        buffer.insert("base", "lidar", 100, translation(0.5, 0.0, 0.0));

        let resolved = buffer.resolve("lidar", "world", 100).unwrap();
        assert!(!resolved.is_fallback());
        assert!(resolved.pose().approx_eq(&translation(1.5, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_chain_respects_rotation() {
        // base sits at world origin yawed 90°; lidar is 1m ahead of base.
        let yaw90 = Pose3D::new(
            Vec3::ZERO,
            Quaternion::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), FRAC_PI_2),
        );
        let mut buffer = TransformBuffer::new();
        buffer.insert("world", "base", 100, yaw90);
        buffer.insert("base", "lidar", 100, translation(1.0, 0.0, 0.0));

        let pose = buffer.resolve("lidar", "world", 100).unwrap().pose();
        // lidar origin lands at world (0, 1, 0).
        assert!(pose.translation.distance(&Vec3::new(0.0, 1.0, 0.0)) < 1e-5);
    }

    #[test]
    fn test_partial_chain_history_degrades_whole_lookup() {
        let mut buffer = TransformBuffer::new();
        buffer.insert("world", "base", 100, translation(1.0, 0.0, 0.0));
        buffer.insert("world", "base", 200, translation(1.0, 0.0, 0.0));
        // The second edge only has an old sample.
        buffer.insert("base", "lidar", 100, translation(0.5, 0.0, 0.0));

        let resolved = buffer.resolve("lidar", "world", 200).unwrap();
        assert!(resolved.is_fallback());
        assert!(resolved.pose().approx_eq(&translation(1.5, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_history_cap_evicts_oldest() {
        let mut buffer = TransformBuffer::with_history(2);
        buffer.insert("world", "lidar", 100, translation(1.0, 0.0, 0.0));
        buffer.insert("world", "lidar", 200, translation(2.0, 0.0, 0.0));
        buffer.insert("world", "lidar", 300, translation(3.0, 0.0, 0.0));

        // The t=100 sample is gone; resolving there now degrades.
        let resolved = buffer.resolve("lidar", "world", 100).unwrap();
        assert!(resolved.is_fallback());
        assert!(resolved.pose().approx_eq(&translation(3.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_out_of_order_insert_keeps_sorted_history() {
        let mut buffer = TransformBuffer::new();
        buffer.insert("world", "lidar", 300, translation(3.0, 0.0, 0.0));
        buffer.insert("world", "lidar", 100, translation(1.0, 0.0, 0.0));
        buffer.insert("world", "lidar", 200, translation(2.0, 0.0, 0.0));

        let resolved = buffer.resolve("lidar", "world", 150).unwrap();
        assert!(!resolved.is_fallback());
        assert!(resolved.pose().approx_eq(&translation(1.5, 0.0, 0.0), 1e-5));
    }
}
