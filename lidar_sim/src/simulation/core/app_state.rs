// lidar_sim/src/simulation/core/app_state.rs

use bevy::{ecs::schedule::SystemSet, prelude::States};

/// Defines the major phases of the application's lifecycle.
#[derive(States, Debug, Clone, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    /// The initial state. The scenario file is read here.
    #[default]
    Loading,

    /// The scenario is loaded. We are now spawning the world, the
    /// platforms and the sensors mounted on them.
    SceneBuilding,

    /// The scene is built. Sensors tick on the fixed schedule.
    Running,
}

/// System sets to control the order of execution during the SceneBuilding state.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneBuildSet {
    /// Pass 1: Static world geometry (ground, obstacles).
    World,

    /// Pass 2: Platform shells carrying a `SpawnPlatformRequest`.
    CreateRequests,

    /// Pass 3: Sensor child entities for every mount of every request.
    ProcessSensors,

    /// Pass 4: Remove all temporary request components.
    Cleanup,
}

// =========================================================================
// == Main Simulation Sets ==
// =========================================================================

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Systems that simulate raw physical sensors.
    Sensors,
    /// Moves published scans from the sensor topics onto Bevy events.
    Transport,
    /// Anything reading `LaserScanEvent`s.
    Consumers,
}
