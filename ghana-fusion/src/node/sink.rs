//! Publication boundary for extracted clouds.
//!
//! Transport is out of scope here; the daemon hands extracted clouds to a
//! [`CloudSink`] and whatever sits behind it (an in-process channel, a
//! bridge, a recorder) carries them further.

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::extraction::{ColorCloud, IntensityCloud};

/// Consumer of extracted point clouds.
///
/// Implementations must not block the fusion worker; a slow consumer drops
/// rather than stalls.
pub trait CloudSink: Send {
    /// Hand off the per-cycle near-surface color cloud.
    fn publish_surface(&self, cloud: ColorCloud);

    /// Hand off the full-volume intensity cloud (diagnostic channel).
    fn publish_all_updated(&self, cloud: IntensityCloud);
}

/// Channel-backed sink: clouds are forwarded over in-process channels.
pub struct ChannelSink {
    surface_tx: Sender<ColorCloud>,
    intensity_tx: Sender<IntensityCloud>,
}

impl ChannelSink {
    /// Create a sink plus the receiving ends of both channels.
    pub fn new() -> (Self, Receiver<ColorCloud>, Receiver<IntensityCloud>) {
        let (surface_tx, surface_rx) = unbounded();
        let (intensity_tx, intensity_rx) = unbounded();
        (
            Self {
                surface_tx,
                intensity_tx,
            },
            surface_rx,
            intensity_rx,
        )
    }
}

impl CloudSink for ChannelSink {
    fn publish_surface(&self, cloud: ColorCloud) {
        // A dropped receiver is a consumer lifecycle event, not a pipeline
        // failure.
        if self.surface_tx.send(cloud).is_err() {
            log::warn!("surface cloud consumer disconnected");
        }
    }

    fn publish_all_updated(&self, cloud: IntensityCloud) {
        if self.intensity_tx.send(cloud).is_err() {
            log::warn!("intensity cloud consumer disconnected");
        }
    }
}
