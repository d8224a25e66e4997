//! Pelorus: depth camera to Zenoh bridge.
//!
//! Captures synchronized color and depth frames from an RGB-D camera,
//! renders the depth frame as a false-color image, and republishes both as
//! keelson `RawImage` envelopes on the Zenoh bus. A capture thread and a
//! publish loop communicate through a single latest-wins slot, so a slow bus
//! drops frames instead of backing up the camera.

pub mod capture;
pub mod cli;
pub mod pipeline;
pub mod publish;
pub mod utils;

use serde::{Deserialize, Serialize};

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera: CameraConfig,
    pub bus: BusConfig,
    pub publish: PublishOptions,
}

/// Fixed capture configuration, negotiated once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Bus connection and key-space parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Zenoh router endpoints to connect to, e.g. `tcp/10.0.0.1:7447`.
    pub connect: Vec<String>,
    /// Keelson realm, the root segment of every key.
    pub realm: String,
    /// Entity id of the platform this bridge runs on.
    pub entity_id: String,
    /// Source id of the camera, appended to the subject segments.
    pub source_id: String,
}

/// Which streams to publish and how to stamp them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishOptions {
    pub color: bool,
    pub depth: bool,
    /// Frame id stamped into every envelope, omitted when unset.
    pub frame_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            bus: BusConfig::default(),
            publish: PublishOptions::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            connect: Vec::new(),
            realm: "rise".into(),
            entity_id: "pelorus".into(),
            source_id: "rgbd0".into(),
        }
    }
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            color: true,
            depth: true,
            frame_id: None,
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file plus `PELORUS_*`
    /// environment variables. Missing sections fall back to defaults.
    pub fn load(path: Option<&str>) -> color_eyre::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let loaded = builder
            .add_source(config::Environment::with_prefix("PELORUS").separator("__"))
            .build()?;
        Ok(loaded.try_deserialize()?)
    }
}
