// lidar_sim/src/simulation/plugins/world/spawner.rs

use crate::prelude::*;
use avian3d::prelude::*;

// =========================================================================
// == Components & Plugin ==
// =========================================================================

/// How a collider looks to a lidar. Entities without it return hits with
/// zero intensity and no fiducial.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct SurfaceProperties {
    pub intensity: f64,
    pub fiducial: i32,
}

impl Default for SurfaceProperties {
    fn default() -> Self {
        Self {
            intensity: 0.0,
            fiducial: NO_FIDUCIAL,
        }
    }
}

/// A body carrying sensors.
#[derive(Component, Debug, Clone)]
pub struct Platform {
    pub name: String,
}

pub struct WorldSpawnerPlugin;

impl Plugin for WorldSpawnerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            (
                spawn_world.in_set(SceneBuildSet::World),
                attach_platform_bodies.in_set(SceneBuildSet::ProcessSensors),
            ),
        );
    }
}

// =========================================================================
// == Spawning Systems ==
// =========================================================================

fn spawn_world(
    mut commands: Commands,
    scenario: Res<ScenarioConfig>,
    meshes: Option<ResMut<Assets<Mesh>>>,
    materials: Option<ResMut<Assets<StandardMaterial>>>,
) {
    // Mesh and material stores exist only when rendering is enabled.
    let mut visuals = meshes.zip(materials);
    let world = &scenario.world;

    // --- Ground ---
    if world.ground_size > 0.0 {
        let size = world.ground_size as f32;
        let mut ground = commands.spawn((
            Name::new("ground"),
            RigidBody::Static,
            Collider::cuboid(size, 0.1, size),
            Transform::from_xyz(0.0, -0.05, 0.0),
        ));
        if let Some((meshes, materials)) = visuals.as_mut() {
            ground.insert((
                Mesh3d(meshes.add(Cuboid::new(size, 0.1, size))),
                MeshMaterial3d(materials.add(Color::srgb(0.3, 0.5, 0.3))),
            ));
        }
    }

    // --- Obstacles ---
    for obstacle in &world.obstacles {
        let [x, y, z] = obstacle.size.map(|s| s as f32);
        if !(x > 0.0 && y > 0.0 && z > 0.0) {
            warn!(
                "[WORLD] Skipping obstacle '{}' with non-positive size {:?}",
                obstacle.name, obstacle.size
            );
            continue;
        }
        // ENU extents (x, y, z) are the box's Bevy-local (x, z, y).
        let mut entity = commands.spawn((
            Name::new(obstacle.name.clone()),
            RigidBody::Static,
            Collider::cuboid(x, z, y),
            obstacle.pose.to_bevy_transform(),
            SurfaceProperties {
                intensity: obstacle.intensity,
                fiducial: obstacle.fiducial.unwrap_or(NO_FIDUCIAL),
            },
        ));
        if let Some((meshes, materials)) = visuals.as_mut() {
            entity.insert((
                Mesh3d(meshes.add(Cuboid::new(x, z, y))),
                MeshMaterial3d(materials.add(Color::srgb(0.7, 0.7, 0.75))),
            ));
        }
        debug!("[WORLD] Spawned obstacle '{}'", obstacle.name);
    }

    if visuals.is_some() {
        spawn_lighting_and_camera(&mut commands);
    }
    info!(
        "[WORLD] Spawned ground and {} obstacle(s)",
        world.obstacles.len()
    );
}

/// Gives every requested platform its collision box.
fn attach_platform_bodies(
    mut commands: Commands,
    requests: Query<(Entity, &SpawnPlatformRequest)>,
) {
    for (entity, request) in &requests {
        let [x, y, z] = request.0.size.map(|s| s as f32);
        commands.entity(entity).insert((
            Platform {
                name: request.0.name.clone(),
            },
            RigidBody::Kinematic,
            Collider::cuboid(x, z, y),
        ));
    }
}

fn spawn_lighting_and_camera(commands: &mut Commands) {
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            illuminance: 15_000.0,
            ..default()
        },
        Transform::from_xyz(4.0, 10.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(-12.0, 14.0, 12.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}
