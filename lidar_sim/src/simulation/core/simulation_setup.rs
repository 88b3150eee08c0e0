// lidar_sim/src/simulation/core/simulation_setup.rs

use std::time::Duration;

use crate::prelude::*;
use crate::simulation::config::structs::ScenarioConfig;
use crate::simulation::core::prng::SimulationRng;

/// Default rate of the fixed schedule the sensors tick on.
pub const DEFAULT_FIXED_RATE_HZ: f64 = 100.0;

pub struct SimulationSetupPlugin;

impl Plugin for SimulationSetupPlugin {
    fn build(&self, app: &mut App) {
        // --- INITIALIZE STATE, RESOURCES & EVENTS ---
        app.init_state::<AppState>()
            .init_resource::<ScenarioConfig>()
            .init_resource::<SimulationRng>()
            .add_event::<LaserScanEvent>()
            .insert_resource(Time::<Fixed>::from_duration(Duration::from_secs_f64(
                1.0 / DEFAULT_FIXED_RATE_HZ,
            )));

        // --- CONFIGURE THE SPAWNING PIPELINE ---
        app.configure_sets(
            OnEnter(AppState::SceneBuilding),
            (
                SceneBuildSet::World,
                SceneBuildSet::CreateRequests,
                SceneBuildSet::ProcessSensors,
                SceneBuildSet::Cleanup,
            )
                .chain(),
        );

        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            (
                spawn_platform_shells.in_set(SceneBuildSet::CreateRequests),
                cleanup_spawn_requests.in_set(SceneBuildSet::Cleanup),
                transition_to_running
                    .in_set(SceneBuildSet::Cleanup)
                    .after(cleanup_spawn_requests),
            ),
        );

        // --- CONFIGURE THE RUNTIME SCHEDULE ---
        app.configure_sets(
            FixedUpdate,
            (
                SimulationSet::Sensors,
                SimulationSet::Transport,
                SimulationSet::Consumers,
            )
                .chain()
                .run_if(in_state(AppState::Running)),
        );

        app.add_systems(
            Update,
            stop_after_duration.run_if(in_state(AppState::Running)),
        );
    }
}

fn spawn_platform_shells(mut commands: Commands, scenario: Res<ScenarioConfig>) {
    for platform in &scenario.platforms {
        info!(
            "[SPAWN] Posting spawn request for platform '{}' with {} lidar(s)",
            platform.name,
            platform.lidars.len()
        );
        commands.spawn((
            Name::new(platform.name.clone()),
            platform.pose.to_bevy_transform(),
            SpawnPlatformRequest(platform.clone()),
        ));
    }
}

fn cleanup_spawn_requests(
    mut commands: Commands,
    requests: Query<Entity, With<SpawnPlatformRequest>>,
) {
    for entity in &requests {
        commands.entity(entity).remove::<SpawnPlatformRequest>();
    }
}

fn transition_to_running(mut next_state: ResMut<NextState<AppState>>) {
    info!("Scene building complete. Transitioning to Running state.");
    next_state.set(AppState::Running);
}

/// Ends the app once the scenario's duration has elapsed. A duration of
/// zero runs forever.
fn stop_after_duration(
    time: Res<Time>,
    scenario: Res<ScenarioConfig>,
    mut exit: EventWriter<AppExit>,
    mut stopped: Local<bool>,
) {
    let duration = scenario.simulation.duration_seconds;
    if *stopped || duration <= 0.0 {
        return;
    }
    if time.elapsed_secs_f64() >= duration {
        info!("Scenario duration of {:.1}s reached. Exiting.", duration);
        exit.write(AppExit::Success);
        *stopped = true;
    }
}
