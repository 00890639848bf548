//! Fusion worker thread.
//!
//! One named thread owns the [`FusionNode`] and drains the cloud channel,
//! processing each arrival to completion before taking the next. Per-cycle
//! errors are logged and absorbed; the worker only exits on shutdown or
//! when every producer has hung up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use super::FusionNode;
use crate::cloud::RawCloud;

/// Fusion worker thread handle.
pub struct FusionThread {
    handle: JoinHandle<()>,
}

impl FusionThread {
    /// Spawn the worker.
    pub fn spawn(
        mut node: FusionNode,
        cloud_rx: Receiver<RawCloud>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let handle = thread::Builder::new()
            .name("fusion".into())
            .spawn(move || run_fusion_loop(&mut node, &cloud_rx, &running))
            .expect("Failed to spawn fusion thread");

        Self { handle }
    }

    /// Wait for the worker to finish.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run_fusion_loop(
    node: &mut FusionNode,
    cloud_rx: &Receiver<RawCloud>,
    running: &Arc<AtomicBool>,
) {
    log::info!("fusion thread starting");

    while running.load(Ordering::Relaxed) {
        // Bounded wait so the shutdown flag is observed without a wakeup.
        match cloud_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(raw) => {
                // A failed cycle is dropped, never retried; the error was
                // already reported where it occurred.
                let _ = node.on_cloud(&raw);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                log::info!("cloud channel closed");
                break;
            }
        }
    }

    log::info!("fusion thread shutting down");
}
