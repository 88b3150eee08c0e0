// lidar_sim/src/simulation/plugins/sensors/lidar.rs
use avian3d::prelude::{SpatialQuery, SpatialQueryFilter};
use std::time::Duration;

// --- Simulation Crate Imports ---
use crate::prelude::*;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::transforms::{
    bevy_global_transform_to_enu_iso, sensor_ray_to_bevy_direction,
};

// --- Core Library Imports ---
use lidar_core::transport::SharedTopic;

/// Messages kept per sensor topic between two relay passes.
pub const TOPIC_CAPACITY: usize = 8;

// =========================================================================
// == Components & Plugin ==
// =========================================================================

/// A simulated lidar mounted on a platform.
#[derive(Component)]
pub struct Lidar {
    pub sensor: LidarSensor,
    /// Scan period. `None` scans on every fixed tick.
    pub timer: Option<Timer>,
    topic: SharedTopic<LaserScan>,
    reader: TopicReader,
}

impl Lidar {
    /// Loads and initializes a sensor from `config`. A noise section
    /// without a seed gets one from the simulation RNG.
    pub fn from_config(config: &LidarConfig, rng: &mut SimulationRng) -> Result<Self, LidarError> {
        let mut config = config.clone();
        if let Some(noise) = config.noise.as_mut() {
            noise.seed.get_or_insert_with(|| rng.next_seed());
        }

        let mut sensor = LidarSensor::new();
        sensor.load(&config)?;
        let publisher = TopicPublisher::new(sensor.topic(), TOPIC_CAPACITY);
        let topic = publisher.topic();
        sensor.init(publisher)?;

        let rate = sensor.update_rate();
        let timer = (rate > 0.0)
            .then(|| Timer::new(Duration::from_secs_f64(1.0 / rate), TimerMode::Repeating));

        Ok(Self {
            sensor,
            timer,
            topic,
            reader: TopicReader::new(),
        })
    }

    pub fn topic(&self) -> SharedTopic<LaserScan> {
        self.topic.clone()
    }

    /// Advances the scan timer; true when a scan is due.
    fn tick(&mut self, dt: Duration) -> bool {
        match self.timer.as_mut() {
            Some(timer) => {
                timer.tick(dt);
                timer.just_finished()
            }
            None => true,
        }
    }
}

pub struct LidarSensorPlugin;

impl Plugin for LidarSensorPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            spawn_lidars.in_set(SceneBuildSet::ProcessSensors),
        )
        .add_systems(
            FixedUpdate,
            (
                lidar_sensor_system.in_set(SimulationSet::Sensors),
                relay_scans_system.in_set(SimulationSet::Transport),
                log_scans_system.in_set(SimulationSet::Consumers),
            ),
        )
        .add_systems(Last, finalize_lidars_on_exit);
    }
}

// =========================================================================
// == Spawning System ==
// =========================================================================

fn spawn_lidars(
    mut commands: Commands,
    requests: Query<(Entity, &Name, &SpawnPlatformRequest)>,
    mut rng: ResMut<SimulationRng>,
) {
    for (platform_entity, platform_name, request) in &requests {
        for mount in &request.0.lidars {
            let mut lidar = match Lidar::from_config(&mount.sensor, &mut rng) {
                Ok(lidar) => lidar,
                Err(e) => {
                    error!(
                        "  -> Skipping lidar '{}' on platform '{}': {}",
                        mount.sensor.name,
                        platform_name.as_str(),
                        e
                    );
                    continue;
                }
            };

            let sensor_entity = commands.spawn_empty().id();
            lidar
                .sensor
                .set_frame_handle(FrameHandle::from_entity(sensor_entity));
            info!(
                "  -> Spawning lidar '{}' on platform '{}' at {:.1} Hz, publishing on '{}'",
                lidar.sensor.name(),
                platform_name.as_str(),
                lidar.sensor.update_rate(),
                lidar.sensor.topic()
            );

            commands.entity(sensor_entity).insert((
                Name::new(lidar.sensor.name().to_string()),
                mount.mount.to_bevy_transform(),
                lidar,
            ));
            commands.entity(platform_entity).add_child(sensor_entity);
        }
    }
}

// =========================================================================
// == Raycast Backend ==
// =========================================================================

/// Intersects sensor rays with the avian collision world.
///
/// Rays leave from the sensor's world origin; the platform carrying the
/// sensor is excluded. `surface_of` reports how the hit entity looks to
/// the sensor.
pub struct AvianRaycastBackend<'a, 'w, 's, S> {
    spatial_query: &'a SpatialQuery<'w, 's>,
    surface_of: S,
    origin: Vec3,
    rotation: Quat,
    filter: SpatialQueryFilter,
}

impl<'a, 'w, 's, S> AvianRaycastBackend<'a, 'w, 's, S>
where
    S: Fn(Entity) -> SurfaceProperties,
{
    pub fn new(
        spatial_query: &'a SpatialQuery<'w, 's>,
        surface_of: S,
        sensor_transform: &GlobalTransform,
        excluded: Entity,
    ) -> Self {
        Self {
            spatial_query,
            surface_of,
            origin: sensor_transform.translation(),
            rotation: sensor_transform.rotation(),
            filter: SpatialQueryFilter::from_excluded_entities([excluded]),
        }
    }

    fn cast(&self, ray: &SensorRay, max_distance: f32) -> RawSample {
        let Some(direction) = sensor_ray_to_bevy_direction(ray, self.rotation) else {
            return RawSample::miss();
        };
        match self
            .spatial_query
            .cast_ray(self.origin, direction, max_distance, true, &self.filter)
        {
            Some(hit) => {
                let surface = (self.surface_of)(hit.entity);
                RawSample::hit(hit.distance as f64, surface.intensity).with_fiducial(surface.fiducial)
            }
            None => RawSample::miss(),
        }
    }
}

impl<S> IntersectionBackend for AvianRaycastBackend<'_, '_, '_, S>
where
    S: Fn(Entity) -> SurfaceProperties,
{
    fn sample(&mut self, request: &ScanRequest<'_>) -> Result<Vec<RawSample>, BackendError> {
        let max_distance = request.range_max as f32;
        Ok(request
            .rays
            .iter()
            .map(|ray| self.cast(ray, max_distance))
            .collect())
    }
}

// =========================================================================
// == Runtime Systems ==
// =========================================================================

/// Ticks every lidar whose timer is due against the current physics world.
fn lidar_sensor_system(
    time: Res<Time>,
    spatial_query: SpatialQuery,
    surfaces: Query<&SurfaceProperties>,
    parent_query: Query<(Entity, &Children)>,
    mut lidar_query: Query<(&mut Lidar, &GlobalTransform)>,
) {
    let dt = time.delta();
    let now = time.elapsed_secs_f64();

    for (platform_entity, children) in &parent_query {
        for &child_entity in children {
            let Ok((mut lidar, sensor_transform)) = lidar_query.get_mut(child_entity) else {
                continue;
            };
            if !lidar.tick(dt) {
                continue;
            }

            lidar
                .sensor
                .set_world_pose(bevy_global_transform_to_enu_iso(sensor_transform));
            let surface_of = |entity: Entity| surfaces.get(entity).copied().unwrap_or_default();
            let mut backend =
                AvianRaycastBackend::new(&spatial_query, surface_of, sensor_transform, platform_entity);

            match lidar.sensor.update(now, &mut backend) {
                Ok(UpdateOutcome::Updated) => {}
                Ok(UpdateOutcome::Skipped) => {
                    trace!("Lidar '{}' is paused", lidar.sensor.name());
                }
                Err(LidarError::BackendUnavailable(e)) => {
                    warn!("Lidar '{}' skipped a scan: {}", lidar.sensor.name(), e);
                }
                Err(e) => {
                    error!("Lidar '{}' failed to update: {}", lidar.sensor.name(), e);
                }
            }
        }
    }
}

/// Moves freshly published scans from each sensor topic onto `LaserScanEvent`s.
pub fn relay_scans_system(
    mut lidar_query: Query<&mut Lidar>,
    mut scan_writer: EventWriter<LaserScanEvent>,
) {
    for mut lidar in &mut lidar_query {
        let Lidar { topic, reader, .. } = &mut *lidar;
        let topic = topic.lock();
        for stamped in reader.read(&*topic) {
            scan_writer.write(LaserScanEvent(stamped.message.clone()));
        }
    }
}

fn log_scans_system(mut scan_reader: EventReader<LaserScanEvent>) {
    for LaserScanEvent(scan) in scan_reader.read() {
        let nearest = scan.ranges.iter().copied().fold(scan.range_max, f64::min);
        debug!(
            "[LIDAR] '{}' ({:?}) t={:.2}s: {} ranges, {} detections, nearest {:.2} m",
            scan.frame_id,
            scan.sensor_handle.to_entity(),
            scan.timestamp,
            scan.ranges.len(),
            scan.detection_count(),
            nearest
        );
    }
}

fn finalize_lidars_on_exit(mut exits: EventReader<AppExit>, mut lidar_query: Query<&mut Lidar>) {
    if exits.read().last().is_none() {
        return;
    }
    for mut lidar in &mut lidar_query {
        lidar.sensor.fini();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use bevy::ecs::event::Events;

    fn config(update_rate: f64) -> LidarConfig {
        let mut config = LidarConfig::planar("test_lidar", 8, (-1.0, 1.0), (0.1, 10.0));
        config.update_rate = update_rate;
        config
    }

    fn two_meters(request: &ScanRequest<'_>) -> Result<Vec<RawSample>, BackendError> {
        Ok(vec![RawSample::hit(2.0, 0.25); request.rays.len()])
    }

    #[test]
    fn timer_follows_update_rate() {
        let mut rng = SimulationRng::from_seed(Some(1));
        let lidar = Lidar::from_config(&config(20.0), &mut rng).unwrap();
        let period = lidar.timer.as_ref().map(|t| t.duration().as_secs_f64());
        assert_abs_diff_eq!(period.unwrap(), 0.05, epsilon = 1e-9);

        let every_tick = Lidar::from_config(&config(0.0), &mut rng).unwrap();
        assert!(every_tick.timer.is_none());
    }

    #[test]
    fn timer_gates_scans() {
        let mut rng = SimulationRng::from_seed(Some(1));
        let mut lidar = Lidar::from_config(&config(10.0), &mut rng).unwrap();
        let step = Duration::from_millis(25);
        let due: Vec<bool> = (0..8).map(|_| lidar.tick(step)).collect();
        assert_eq!(due, vec![false, false, false, true, false, false, false, true]);
    }

    #[test]
    fn unseeded_noise_draws_from_simulation_rng() {
        let mut noisy = config(10.0);
        noisy.noise = Some(NoiseConfig {
            mean: 0.0,
            stddev: 0.01,
            seed: None,
        });

        let scan = |seed| {
            let mut rng = SimulationRng::from_seed(Some(seed));
            let mut lidar = Lidar::from_config(&noisy, &mut rng).unwrap();
            lidar.sensor.update(0.0, &mut backend_fn(two_meters)).unwrap();
            lidar.sensor.scan()
        };
        assert_eq!(*scan(5), *scan(5));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut rng = SimulationRng::default();
        let mut bad = config(10.0);
        bad.range = None;
        assert!(matches!(
            Lidar::from_config(&bad, &mut rng),
            Err(LidarError::Configuration(_))
        ));
    }

    #[test]
    fn relay_turns_published_scans_into_events() {
        let mut app = App::new();
        app.add_event::<LaserScanEvent>()
            .add_systems(Update, relay_scans_system);

        let mut rng = SimulationRng::from_seed(Some(1));
        let mut lidar = Lidar::from_config(&config(10.0), &mut rng).unwrap();
        let sensor_entity = app.world_mut().spawn_empty().id();
        lidar
            .sensor
            .set_frame_handle(FrameHandle::from_entity(sensor_entity));
        lidar.sensor.update(0.5, &mut backend_fn(two_meters)).unwrap();
        lidar.sensor.update(0.6, &mut backend_fn(two_meters)).unwrap();
        app.world_mut().entity_mut(sensor_entity).insert(lidar);

        app.update();

        let events = app.world().resource::<Events<LaserScanEvent>>();
        let mut cursor = events.get_cursor();
        let scans: Vec<&LaserScanEvent> = cursor.read(events).collect();
        assert_eq!(scans.len(), 2);
        assert_eq!(scans[0].0.frame_id, "test_lidar");
        assert_eq!(scans[0].0.sensor_handle.to_entity(), sensor_entity);
        assert_abs_diff_eq!(scans[1].0.timestamp, 0.6);
        assert_eq!(scans[1].0.ranges, vec![2.0; 8]);
    }
}
