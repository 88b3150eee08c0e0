// lidar_sim/src/simulation/config/mod.rs

//! Loading of the scenario TOML into the `ScenarioConfig` resource.

pub mod structs;

use bevy::prelude::*;
use figment::{
    providers::{Format, Toml},
    Figment,
};
use std::path::Path;

use crate::cli::Cli;
use crate::prelude::AppState;
use crate::simulation::core::prng::SimulationRng;
pub use structs::ScenarioConfig;

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ScenarioConfig>().add_systems(
            OnEnter(AppState::Loading),
            (load_scenario_system, transition_to_scene_building).chain(),
        );
    }
}

/// Reads a scenario file.
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig, figment::Error> {
    Figment::new().merge(Toml::file_exact(path)).extract()
}

/// Parses a scenario from TOML text.
pub fn parse_scenario(toml: &str) -> Result<ScenarioConfig, figment::Error> {
    Figment::new().merge(Toml::string(toml)).extract()
}

fn load_scenario_system(
    cli: Option<Res<Cli>>,
    mut scenario: ResMut<ScenarioConfig>,
    mut rng: ResMut<SimulationRng>,
    mut fixed_time: ResMut<Time<Fixed>>,
) {
    let cli = cli.map(|c| Cli::clone(&c)).unwrap_or_default();
    info!("Loading scenario from: {}", cli.scenario.display());

    match load_scenario(&cli.scenario) {
        Ok(loaded) => {
            info!(
                "Loaded scenario with {} obstacle(s), {} platform(s) and {} lidar(s)",
                loaded.world.obstacles.len(),
                loaded.platforms.len(),
                loaded.lidar_count()
            );
            *scenario = loaded;
        }
        Err(e) => {
            error!(
                "Failed to load or parse scenario file at {}: {}. Running an empty scene.",
                cli.scenario.display(),
                e
            );
        }
    }

    *rng = SimulationRng::from_seed(scenario.simulation.seed);
    let rate = scenario.simulation.fixed_rate_hz;
    if rate.is_finite() && rate > 0.0 {
        fixed_time.set_timestep_hz(rate);
    } else {
        warn!("Ignoring invalid fixed_rate_hz {}", rate);
    }
}

fn transition_to_scene_building(mut next_state: ResMut<NextState<AppState>>) {
    info!("Configuration loading complete. Transitioning to SceneBuilding state.");
    next_state.set(AppState::SceneBuilding);
}
