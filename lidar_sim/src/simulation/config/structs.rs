// lidar_sim/src/simulation/config/structs.rs

use bevy::prelude::{Resource, Transform};
use lidar_core::config::LidarConfig;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::simulation::core::transforms::enu_iso_to_bevy_transform;

// =========================================================================
// == Top-Level Configuration Resource ==
// =========================================================================

/// # ScenarioConfig
/// The root of the data parsed from a scenario TOML file.
#[derive(Resource, Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub simulation: SimulationSettings,

    #[serde(default)]
    pub world: WorldConfig,

    /// `[[platforms]]` tables. Each one carries its mounted lidars.
    #[serde(default)]
    pub platforms: Vec<PlatformConfig>,
}

impl ScenarioConfig {
    pub fn lidar_count(&self) -> usize {
        self.platforms.iter().map(|p| p.lidars.len()).sum()
    }
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SimulationSettings {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Duration of the simulation in seconds. Zero runs until closed.
    #[serde(default)]
    pub duration_seconds: f64,
    /// Rate of the fixed schedule, in Hz.
    #[serde(default = "default_fixed_rate_hz")]
    pub fixed_rate_hz: f64,
}

fn default_fixed_rate_hz() -> f64 {
    100.0
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            seed: None,
            duration_seconds: 0.0,
            fixed_rate_hz: default_fixed_rate_hz(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct WorldConfig {
    /// Side length of the square ground plane, in meters. Zero disables it.
    #[serde(default = "default_ground_size")]
    pub ground_size: f64,
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
}

fn default_ground_size() -> f64 {
    50.0
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            ground_size: default_ground_size(),
            obstacles: Vec::new(),
        }
    }
}

/// A static box in the world.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ObstacleConfig {
    pub name: String,
    /// Pose of the box center, ENU.
    #[serde(default)]
    pub pose: Pose,
    /// Full extents along the box's own x, y, z axes, in meters.
    pub size: [f64; 3],
    /// Retro-reflectivity reported for hits on this box.
    #[serde(default)]
    pub intensity: f64,
    /// Fiducial id reported for hits on this box.
    pub fiducial: Option<i32>,
}

/// A body that sensors are mounted on.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    pub name: String,
    #[serde(default)]
    pub pose: Pose,
    /// Collision box of the platform itself. Its own lidars never see it.
    #[serde(default = "default_platform_size")]
    pub size: [f64; 3],
    #[serde(default)]
    pub lidars: Vec<LidarMount>,
}

fn default_platform_size() -> [f64; 3] {
    [0.6, 0.4, 0.3]
}

/// A lidar and where it sits on its platform.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LidarMount {
    /// Pose relative to the platform, ENU.
    #[serde(default)]
    pub mount: Pose,
    pub sensor: LidarConfig,
}

// =========================================================================
// == Helper Structs ==
// =========================================================================

/// A pose in the ENU frame: translation in meters and roll/pitch/yaw in degrees.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Pose {
    #[serde(default)]
    pub translation: [f64; 3],
    #[serde(default)]
    pub rotation_deg: [f64; 3],
}

impl Pose {
    pub fn to_isometry(&self) -> Isometry3<f64> {
        let [x, y, z] = self.translation;
        let [roll, pitch, yaw] = self.rotation_deg.map(f64::to_radians);
        Isometry3::from_parts(
            Translation3::from(Vector3::new(x, y, z)),
            UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        )
    }

    pub fn to_bevy_transform(&self) -> Transform {
        enu_iso_to_bevy_transform(&self.to_isometry())
    }
}
