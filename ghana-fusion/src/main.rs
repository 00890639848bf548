//! Ghana-Fusion daemon.
//!
//! Wires the fusion pipeline together: a cloud source feeding a bounded
//! queue, the fusion worker owning the TSDF volume, and a consumer
//! draining the publication channels.
//!
//! Real sensor transport is out of scope; the daemon ships with a
//! simulated source (a colored cylindrical room scanned by a slowly
//! drifting sensor) so the full pipeline can be run and observed.
//!
//! # Usage
//!
//! ```bash
//! # With default config
//! cargo run --release
//!
//! # With custom config file
//! cargo run --release -- --config ghana-fusion.toml
//! ```

use std::f32::consts::TAU;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};

use ghana_fusion::cloud::{FieldType, COLOR_FIELD};
use ghana_fusion::config::SourceSection;
use ghana_fusion::{
    shared_transform_buffer, ChannelSink, ColorCloud, Config, FusionNode, FusionThread,
    IntensityCloud, RawCloud, SharedTransformBuffer,
};
use ghana_map::core::{Pose3D, Quaternion, Rgba, Vec3};

// ============================================================================
// CLI Arguments
// ============================================================================

struct Args {
    config_path: Option<String>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut result = Args { config_path: None };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    result.config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    result
}

fn print_help() {
    println!("ghana-fusion - streaming TSDF surface mapping daemon");
    println!();
    println!("USAGE:");
    println!("    ghana-fusion [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    -c, --config <FILE>     Configuration file (default: ghana-fusion.toml)");
    println!("    -h, --help              Print help information");
    println!();
    println!("CONFIGURATION:");
    println!("    All settings are configured via the TOML config file:");
    println!("    - [map] voxel_size, voxels_per_side: volume geometry");
    println!("    - [fusion] world_frame, queue_depth, publish_all_updated");
    println!("    - [integrator] truncation_distance, max_weight");
    println!("    - [source] sensor_frame, rate_hz: simulated sensor stream");
    println!();
    println!("THREADS:");
    println!("    The daemon runs with 3 fixed threads:");
    println!("    - Source thread: feeds clouds and poses");
    println!("    - Fusion thread: pose resolution, sanitization, integration");
    println!("    - Consumer thread: drains published clouds");
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = parse_args();
    let config = Config::load(args.config_path.as_deref());

    log::info!("ghana-fusion starting");
    log::info!(
        "  Volume: {}m voxels, {} per block side",
        config.map.voxel_size,
        config.map.voxels_per_side
    );
    log::info!(
        "  World frame: {} (queue depth {})",
        config.fusion.world_frame,
        config.fusion.queue_depth
    );
    log::info!(
        "  Full-volume output: {}",
        if config.fusion.publish_all_updated {
            "enabled"
        } else {
            "disabled"
        }
    );
    log::info!(
        "  Source: simulated '{}' at {}Hz",
        config.source.sensor_frame,
        config.source.rate_hz
    );

    // Setup signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .expect("Error setting Ctrl-C handler");

    run_daemon(&config, running);

    log::info!("ghana-fusion shutdown complete");
}

// ============================================================================
// Daemon wiring
// ============================================================================

fn run_daemon(config: &Config, running: Arc<AtomicBool>) {
    // 1. Shared transform buffer, written by the source thread.
    let transforms = shared_transform_buffer();

    // 2. Bounded cloud queue; the source drops arrivals when full.
    let (cloud_tx, cloud_rx) = bounded::<RawCloud>(config.fusion.queue_depth.max(1));

    // 3. Publication channels.
    let (sink, surface_rx, intensity_rx) = ChannelSink::new();

    // 4. Fusion worker owns the node (and through it, the volume).
    let node = FusionNode::new(
        config.node_config(),
        config.map,
        config.integrator,
        transforms.clone(),
        Box::new(sink),
    );
    let fusion_thread = FusionThread::spawn(node, cloud_rx, running.clone());
    log::info!("  Fusion thread started");

    // 5. Consumer thread drains published clouds.
    let consumer_thread = thread::Builder::new()
        .name("consumer".into())
        .spawn(move || run_consumer_loop(&surface_rx, &intensity_rx))
        .expect("Failed to spawn consumer thread");
    log::info!("  Consumer thread started");

    // 6. Simulated source thread feeds poses and clouds.
    let source_config = SimSource {
        section: SourceSection {
            sensor_frame: config.source.sensor_frame.clone(),
            rate_hz: config.source.rate_hz,
            points_per_cloud: config.source.points_per_cloud,
        },
        world_frame: config.fusion.world_frame.clone(),
    };
    let source_running = running.clone();
    let source_thread = thread::Builder::new()
        .name("source".into())
        .spawn(move || run_sim_source(&source_config, &transforms, &cloud_tx, &source_running))
        .expect("Failed to spawn source thread");
    log::info!("  Source thread started");

    log::info!("Daemon running");

    // Main thread just monitors the shutdown flag.
    while running.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(100));
    }

    log::info!("Shutdown signal received, waiting for threads...");

    if let Err(e) = source_thread.join() {
        log::error!("Source thread panicked: {:?}", e);
    }
    if let Err(e) = fusion_thread.join() {
        log::error!("Fusion thread panicked: {:?}", e);
    }
    if let Err(e) = consumer_thread.join() {
        log::error!("Consumer thread panicked: {:?}", e);
    }

    log::info!("All threads stopped");
}

/// Drain publication channels, logging throughput.
fn run_consumer_loop(surface_rx: &Receiver<ColorCloud>, intensity_rx: &Receiver<IntensityCloud>) {
    loop {
        select! {
            recv(surface_rx) -> result => {
                match result {
                    Ok(cloud) => {
                        static COUNT: AtomicU32 = AtomicU32::new(0);
                        let count = COUNT.fetch_add(1, Ordering::Relaxed);
                        if count < 5 || count.is_multiple_of(20) {
                            log::info!(
                                "surface cloud #{}: {} points in frame '{}'",
                                count,
                                cloud.len(),
                                cloud.frame_id
                            );
                        }
                    }
                    Err(_) => break,
                }
            }
            recv(intensity_rx) -> result => {
                match result {
                    Ok(cloud) => log::debug!("intensity cloud: {} points", cloud.len()),
                    Err(_) => break,
                }
            }
        }
    }
    log::info!("consumer thread shutting down");
}

// ============================================================================
// Simulated source
// ============================================================================

struct SimSource {
    section: SourceSection,
    world_frame: String,
}

/// Feed poses and clouds of a synthetic scene until shutdown.
///
/// The sensor drifts along a small circle inside a colored cylindrical
/// room of 2m radius. Clouds advertise the packed-float color channel
/// under an integer type, as common producers do.
fn run_sim_source(
    source: &SimSource,
    transforms: &SharedTransformBuffer,
    cloud_tx: &Sender<RawCloud>,
    running: &Arc<AtomicBool>,
) {
    let period = Duration::from_secs_f32(1.0 / source.section.rate_hz.max(0.1));
    let mut tick = 0u32;

    while running.load(Ordering::Relaxed) {
        let stamp_us = now_us();
        let elapsed = tick as f32 * period.as_secs_f32();

        // Slow circular drift, constant heading.
        let pose = Pose3D::new(
            Vec3::new(
                0.2 * (0.1 * elapsed).cos(),
                0.2 * (0.1 * elapsed).sin(),
                0.0,
            ),
            Quaternion::identity(),
        );
        transforms
            .write()
            .insert(&source.world_frame, &source.section.sensor_frame, stamp_us, pose);

        let cloud = simulated_room_cloud(
            &source.section.sensor_frame,
            stamp_us,
            source.section.points_per_cloud,
        );
        match cloud_tx.try_send(cloud) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                log::warn!("cloud queue full, dropping arrival");
            }
            Err(TrySendError::Disconnected(_)) => break,
        }

        tick += 1;
        thread::sleep(period);
    }

    log::info!("source thread shutting down");
}

/// One ring scan of the synthetic room, in the sensor frame.
fn simulated_room_cloud(frame_id: &str, stamp_us: u64, points: usize) -> RawCloud {
    let mut cloud = RawCloud::empty(frame_id, stamp_us);
    for i in 0..points.max(1) {
        let angle = i as f32 / points.max(1) as f32 * TAU;
        let position = Vec3::new(
            2.0 * angle.cos(),
            2.0 * angle.sin(),
            0.2 * (3.0 * angle).sin(),
        );
        let hue = (angle / TAU * 255.0) as u8;
        cloud.push(position, Rgba::new(hue, 255 - hue, 96));
    }
    cloud.with_declared_type(COLOR_FIELD, FieldType::Uint32)
}

/// Current timestamp in microseconds.
fn now_us() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
