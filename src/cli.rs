//! Command-line interface for the pelorus bridge.

use clap::{Parser, ValueEnum};

use crate::Config;

/// Depth camera to Zenoh bridge.
///
/// Captures synchronized color and depth frames from an RGB-D camera and
/// publishes them as keelson `RawImage` envelopes, with latest-wins buffering
/// and drop-on-congestion QoS.
#[derive(Parser, Debug)]
#[command(name = "pelorus", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long)]
    pub config: Option<String>,

    /// Zenoh router endpoint to connect to (e.g. `tcp/192.168.1.100:7447`).
    /// Can be repeated.
    #[arg(long)]
    pub connect: Vec<String>,

    /// Keelson realm used as the key-space root.
    #[arg(long, short = 'r')]
    pub realm: Option<String>,

    /// Entity id of the platform hosting this bridge.
    #[arg(long, short = 'e')]
    pub entity_id: Option<String>,

    /// Source id of the camera, used in key construction.
    #[arg(long, short = 's')]
    pub source_id: Option<String>,

    /// Frame id stamped into every published envelope.
    #[arg(long, short = 'f')]
    pub frame_id: Option<String>,

    /// Streams to publish (can be repeated). Defaults to both.
    #[arg(long, short = 'p', value_enum)]
    pub publish: Vec<Stream>,

    /// Log filter, e.g. `info` or `pelorus=debug`.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Output streams selectable on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    Color,
    Depth,
}

impl Cli {
    /// Layer command-line flags over the file/environment configuration.
    pub fn apply(&self, config: &mut Config) {
        if !self.connect.is_empty() {
            config.bus.connect = self.connect.clone();
        }
        if let Some(realm) = &self.realm {
            config.bus.realm = realm.clone();
        }
        if let Some(entity_id) = &self.entity_id {
            config.bus.entity_id = entity_id.clone();
        }
        if let Some(source_id) = &self.source_id {
            config.bus.source_id = source_id.clone();
        }
        if let Some(frame_id) = &self.frame_id {
            config.publish.frame_id = Some(frame_id.clone());
        }
        if !self.publish.is_empty() {
            config.publish.color = self.publish.contains(&Stream::Color);
            config.publish.depth = self.publish.contains(&Stream::Depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "pelorus",
            "--realm",
            "harbor",
            "--source-id",
            "bow_cam",
            "--publish",
            "color",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.bus.realm, "harbor");
        assert_eq!(config.bus.source_id, "bow_cam");
        assert!(config.publish.color);
        assert!(!config.publish.depth);
    }

    #[test]
    fn defaults_keep_both_streams() {
        let cli = Cli::parse_from(["pelorus"]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert!(config.publish.color);
        assert!(config.publish.depth);
        assert!(config.publish.frame_id.is_none());
    }
}
