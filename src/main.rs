// src/main.rs
// Runs one tracker cycle on a recorded scan and prints what the robot would do.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use husky_tracker::{ObstacleTracker, RangeScan, TrackerConfig, TransformBuffer};

/// Closest-obstacle tracker, offline driver
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Tracker configuration (YAML); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Range scan to process (YAML, `sensor_msgs/LaserScan` layout)
    scan: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            TrackerConfig::from_yaml_file(path)?
        }
        None => TrackerConfig::default(),
    };

    let scan_file = std::fs::File::open(&args.scan)?;
    let scan: RangeScan = serde_yaml::from_reader(scan_file)?;
    info!("Loaded scan with {} readings", scan.len());

    let buffer = TransformBuffer::from_config(&config.transforms)?;
    let tracker = ObstacleTracker::new(config, buffer)?;
    let previous = tracker.initial_command();

    match tracker.run_cycle(&scan, &previous) {
        Ok(output) => {
            info!(
                "Computed command: linear={:.3}, angular={:.3}",
                output.command.linear.x, output.command.angular
            );
            print!("{}", serde_yaml::to_string(&output)?);
            Ok(())
        }
        Err(err) => {
            error!("Tracking cycle failed: {}", err);
            Err(err.into())
        }
    }
}
