//! Daemon configuration: TOML file with per-section defaults.
//!
//! All settings are fixed at startup; nothing is runtime-reloadable.

use std::fs;

use serde::Deserialize;

use ghana_map::{IntegratorConfig, VolumeConfig};

use crate::extraction::DEFAULT_SURFACE_DISTANCE_FACTOR;
use crate::node::NodeConfig;

/// Top-level daemon configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub map: VolumeConfig,
    #[serde(default)]
    pub integrator: IntegratorConfig,
    #[serde(default)]
    pub fusion: FusionSection,
    #[serde(default)]
    pub source: SourceSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FusionSection {
    /// Fixed world frame all output is attributed to.
    pub world_frame: String,
    /// Cloud input queue depth; arrivals beyond it are dropped with a warning.
    pub queue_depth: usize,
    /// Surface band half-width as a fraction of the voxel size.
    pub surface_distance_factor: f32,
    /// Publish the full-volume intensity cloud each cycle (diagnostic).
    pub publish_all_updated: bool,
}

impl Default for FusionSection {
    fn default() -> Self {
        Self {
            world_frame: "world".to_string(),
            queue_depth: 40,
            surface_distance_factor: DEFAULT_SURFACE_DISTANCE_FACTOR,
            publish_all_updated: false,
        }
    }
}

/// Built-in simulated sensor stream (used when no external feed is wired).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    /// Frame id the simulated sensor publishes under.
    pub sensor_frame: String,
    /// Cloud emission rate in Hz.
    pub rate_hz: f32,
    /// Points per simulated cloud.
    pub points_per_cloud: usize,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            sensor_frame: "lidar".to_string(),
            rate_hz: 2.0,
            points_per_cloud: 360,
        }
    }
}

impl Config {
    /// Read a config file, falling back to defaults on any problem.
    ///
    /// With an explicit path, read/parse failures are logged and defaults
    /// used. Without one, the well-known locations are tried in order.
    pub fn load(path: Option<&str>) -> Config {
        match path {
            Some(path) => match fs::read_to_string(path) {
                Ok(contents) => match basic_toml::from_str(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path);
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse config {}: {}", path, e);
                        Config::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read config {}: {}", path, e);
                    Config::default()
                }
            },
            None => {
                for path in &["ghana-fusion.toml", "/etc/ghana-fusion.toml"] {
                    if let Ok(contents) = fs::read_to_string(path)
                        && let Ok(config) = basic_toml::from_str(&contents)
                    {
                        log::info!("Loaded config from {}", path);
                        return config;
                    }
                }
                Config::default()
            }
        }
    }

    /// Orchestrator settings derived from the fusion section.
    pub fn node_config(&self) -> NodeConfig {
        NodeConfig {
            world_frame: self.fusion.world_frame.clone(),
            surface_distance_factor: self.fusion.surface_distance_factor,
            publish_all_updated: self.fusion.publish_all_updated,
        }
    }
}
