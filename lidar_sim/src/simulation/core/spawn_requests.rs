// lidar_sim/src/simulation/core/spawn_requests.rs

use bevy::prelude::Component;

use crate::simulation::config::structs::PlatformConfig;

/// A temporary component carrying a platform's full config through the
/// SceneBuilding passes. Removed in `SceneBuildSet::Cleanup`.
#[derive(Component)]
pub struct SpawnPlatformRequest(pub PlatformConfig);
