// lidar_sim/src/lib.rs

use bevy::prelude::*;

// Import the plugins defined within the simulation crate.
use crate::simulation::config::ConfigPlugin;
use crate::simulation::core::simulation_setup::SimulationSetupPlugin;
use crate::simulation::plugins::sensors::lidar::LidarSensorPlugin;
use crate::simulation::plugins::world::spawner::WorldSpawnerPlugin;

// Convenience re-exports for files WITHIN the lidar_sim crate and for runners.
pub mod prelude;

pub mod cli;
pub mod simulation;

/// The main plugin that brings together all the simulation parts.
/// A runner adds this one plugin, a `Cli` resource and the physics plugins.
pub struct LidarSimulationPlugin;

impl Plugin for LidarSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            // States, schedule sets, events and the fixed timestep.
            SimulationSetupPlugin,
            // Reads the scenario TOML named by the `Cli` resource.
            ConfigPlugin,
            // Ground plane, obstacles, platforms, lighting.
            WorldSpawnerPlugin,
            // Lidar sensors, their raycast backend and the scan relay.
            LidarSensorPlugin,
        ));
    }
}
