// lidar_sim/examples/lidar_room.rs

//! Runs a lidar scenario end to end.
//!
//! This example:
//! 1. Parses `--scenario` and `--headless` from the command line.
//! 2. Sets up Bevy (windowed, or a bare schedule runner when headless).
//! 3. Adds the avian physics plugins and `LidarSimulationPlugin`.
//! 4. Prints a one-line summary of every scan it receives.
//!
//! To run this example:
//! `cargo run --example lidar_room -- --headless`

use avian3d::prelude::*;
use bevy::{
    app::ScheduleRunnerPlugin, log::LogPlugin, prelude::*, render::mesh::MeshPlugin,
    state::app::StatesPlugin,
};
use clap::Parser;
use std::time::Duration;

use lidar_sim::cli::Cli;
use lidar_sim::prelude::LaserScanEvent;
use lidar_sim::LidarSimulationPlugin;

const LOG_FILTER: &str = "info,wgpu_core=error,wgpu_hal=error,lidar_sim=debug,lidar_core=info";

fn main() {
    let cli = Cli::parse();
    let mut app = App::new();

    if cli.headless {
        app.add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 100.0,
            ))),
            LogPlugin {
                filter: LOG_FILTER.to_string(),
                ..default()
            },
            TransformPlugin,
            AssetPlugin::default(),
            MeshPlugin,
            StatesPlugin,
        ));
    } else {
        app.add_plugins(DefaultPlugins.set(LogPlugin {
            filter: LOG_FILTER.to_string(),
            ..default()
        }))
        .add_plugins(PhysicsDebugPlugin::default());
    }

    app.add_plugins(PhysicsPlugins::default())
        .insert_resource(cli)
        .add_plugins(LidarSimulationPlugin)
        .add_systems(Update, print_scan_summaries);

    info!("Starting lidar simulation...");
    app.run();
}

/// Prints the closest return of every scan.
fn print_scan_summaries(mut scans: EventReader<LaserScanEvent>) {
    for LaserScanEvent(scan) in scans.read() {
        let closest = scan
            .ranges
            .iter()
            .enumerate()
            .filter(|(_, r)| **r < scan.range_max)
            .min_by(|a, b| a.1.total_cmp(b.1));
        match closest {
            Some((index, range)) => info!(
                "{} @ {:.2}s: {}/{} returns, closest {:.2} m at index {}",
                scan.frame_id,
                scan.timestamp,
                scan.detection_count(),
                scan.ranges.len(),
                range,
                index
            ),
            None => info!("{} @ {:.2}s: no returns", scan.frame_id, scan.timestamp),
        }
    }
}
