use std::path::PathBuf;

use clap::Parser;

/// Multi-camera object tracking service: consumes per-camera detections
/// over MQTT, aggregates them into time-synchronized chunks, and publishes
/// per-scope tracks back to the broker.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the service's TOML configuration file.
    pub config_path: PathBuf,
}
