// lidar_sim/src/prelude.rs

// Re-export the entire Bevy prelude for convenience.
pub use bevy::prelude::*;

// Pure lidar types: `LidarSensor`, `LaserScan`, `FrameHandle`, ...
pub use lidar_core::prelude::*;

// Common simulation-specific types for easy access in other plugins.
pub use crate::cli::Cli;
pub use crate::simulation::config::structs::{
    LidarMount, ObstacleConfig, PlatformConfig, Pose, ScenarioConfig, SimulationSettings,
    WorldConfig,
};
pub use crate::simulation::core::app_state::{AppState, SceneBuildSet, SimulationSet};
pub use crate::simulation::core::events::LaserScanEvent;
pub use crate::simulation::core::spawn_requests::SpawnPlatformRequest;
pub use crate::simulation::plugins::sensors::lidar::{Lidar, LidarSensorPlugin};
pub use crate::simulation::plugins::world::spawner::{Platform, SurfaceProperties};
