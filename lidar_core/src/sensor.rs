// lidar_core/src/sensor.rs

//! The lidar sensor: lifecycle, per-tick orchestration and publishing.

use nalgebra::Isometry3;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::callbacks::{FrameCallbacks, FrameConnection};
use crate::config::{LidarConfig, SensorSettings};
use crate::error::{BackendError, LidarError};
use crate::grid::RayGrid;
use crate::messages::{FrameHandle, LaserScan, FRAME_FORMAT};
use crate::noise::RangeNoise;
use crate::perception::{IntersectionBackend, ScanRequest, SensorRay};
use crate::resample::{RangeLimits, RangeResampler};
use crate::scan::{ScanBuffer, ScanReader, ScanSlot, FRAME_CHANNELS};
use crate::transport::ScanPublisher;

/// Externally visible lifecycle state of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorState {
    Unloaded,
    Loaded,
    Active,
    Inactive,
    Finalized,
}

/// What a call to `LidarSensor::update` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// A new scan was swapped in, callbacks ran and the scan was published.
    Updated,
    /// The sensor is paused; the current scan was left untouched.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Unloaded,
    Loaded,
    Initialized,
    Finalized,
}

/// Everything that exists once `load` succeeded.
#[derive(Debug)]
struct Loaded {
    settings: SensorSettings,
    resampler: RangeResampler,
    rays: Vec<SensorRay>,
    noise: Option<RangeNoise>,
}

impl Loaded {
    fn new(settings: SensorSettings) -> Result<Self, LidarError> {
        let noise = settings.noise.as_ref().map(RangeNoise::new).transpose()?;
        Ok(Self {
            resampler: RangeResampler::new(settings.grid, settings.limits),
            rays: settings.grid.rays(),
            noise,
            settings,
        })
    }

    // Angle changes move the rays; counts and therefore the resampling
    // taps stay fixed.
    fn regrid(&mut self, edit: impl FnOnce(&mut RayGrid)) {
        edit(&mut self.settings.grid);
        self.resampler = RangeResampler::new(self.settings.grid, self.settings.limits);
        self.rays = self.settings.grid.rays();
    }
}

/// A simulated lidar.
///
/// Lifecycle: `new` -> `load` -> `init` -> repeated `update` -> `fini`.
/// Scans are read through the accessors here or through a `ScanReader`
/// from any thread; readers always see one complete scan.
pub struct LidarSensor {
    lifecycle: Lifecycle,
    loaded: Option<Loaded>,
    slot: Arc<ScanSlot>,
    callbacks: FrameCallbacks,
    publisher: Option<Box<dyn ScanPublisher>>,
    handle: FrameHandle,
    world_pose: Isometry3<f64>,
}

impl Default for LidarSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LidarSensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LidarSensor")
            .field("state", &self.state())
            .field("name", &self.name())
            .field("handle", &self.handle)
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

impl LidarSensor {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Unloaded,
            loaded: None,
            slot: Arc::new(ScanSlot::default()),
            callbacks: FrameCallbacks::new(),
            publisher: None,
            handle: FrameHandle::default(),
            world_pose: Isometry3::identity(),
        }
    }

    // =====================================================================
    // == Lifecycle ==
    // =====================================================================

    pub fn state(&self) -> SensorState {
        match self.lifecycle {
            Lifecycle::Unloaded => SensorState::Unloaded,
            Lifecycle::Loaded => SensorState::Loaded,
            Lifecycle::Initialized if self.slot.is_active() => SensorState::Active,
            Lifecycle::Initialized => SensorState::Inactive,
            Lifecycle::Finalized => SensorState::Finalized,
        }
    }

    /// Validates `config` and takes over its geometry and limits.
    /// May be called again before `init` to reload.
    pub fn load(&mut self, config: &LidarConfig) -> Result<(), LidarError> {
        if !matches!(self.lifecycle, Lifecycle::Unloaded | Lifecycle::Loaded) {
            return Err(LidarError::InvalidState {
                operation: "load",
                state: self.state(),
            });
        }
        let loaded = Loaded::new(config.validate()?)?;
        let grid = &loaded.settings.grid;
        info!(
            "Loaded lidar '{}': {}x{} rays -> {}x{} ranges, range [{}, {}]",
            loaded.settings.name,
            grid.ray_count(),
            grid.vertical_ray_count(),
            grid.range_count(),
            grid.vertical_range_count(),
            loaded.settings.limits.min,
            loaded.settings.limits.max,
        );
        self.loaded = Some(loaded);
        self.lifecycle = Lifecycle::Loaded;
        Ok(())
    }

    /// Allocates the scan buffers and attaches the publish channel.
    /// The sensor starts out active.
    pub fn init(&mut self, publisher: impl ScanPublisher + 'static) -> Result<(), LidarError> {
        let loaded = match self.lifecycle {
            Lifecycle::Loaded => self.loaded.as_ref().ok_or(LidarError::NotLoaded)?,
            Lifecycle::Unloaded => return Err(LidarError::NotLoaded),
            _ => {
                return Err(LidarError::InvalidState {
                    operation: "init",
                    state: self.state(),
                })
            }
        };
        let settings = &loaded.settings;
        self.slot
            .reset(ScanBuffer::no_detection(&settings.grid, &settings.limits));
        self.slot.set_active(true);
        self.publisher = Some(Box::new(publisher));
        self.lifecycle = Lifecycle::Initialized;
        info!(
            "Initialized lidar '{}' publishing on '{}'",
            settings.name, settings.topic
        );
        Ok(())
    }

    /// Releases the scan buffers and the publish channel, and disconnects
    /// every frame callback. Safe to call more than once.
    pub fn fini(&mut self) {
        if self.lifecycle == Lifecycle::Finalized {
            return;
        }
        self.publisher = None;
        self.callbacks.clear();
        self.slot.reset(ScanBuffer::default());
        self.lifecycle = Lifecycle::Finalized;
        info!("Finalized lidar '{}'", self.name());
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Initialized && self.slot.is_active()
    }

    /// Pauses or resumes scan replacement. While paused, `update` leaves the
    /// current scan alone so several accessor calls read the same data.
    pub fn set_active(&mut self, active: bool) {
        if self.lifecycle != Lifecycle::Initialized {
            warn!(
                "Ignoring set_active({}) on lidar '{}' in state {:?}",
                active,
                self.name(),
                self.state()
            );
            return;
        }
        self.slot.set_active(active);
    }

    // =====================================================================
    // == Per-Tick Update ==
    // =====================================================================

    /// Produces a new scan for time `now` from `backend`.
    ///
    /// On backend failure the previous scan stays current and no callback
    /// fires.
    pub fn update<B>(&mut self, now: f64, backend: &mut B) -> Result<UpdateOutcome, LidarError>
    where
        B: IntersectionBackend + ?Sized,
    {
        if self.lifecycle != Lifecycle::Initialized {
            return Err(LidarError::NotInitialized);
        }
        if !self.slot.is_active() {
            return Ok(UpdateOutcome::Skipped);
        }
        let loaded = self.loaded.as_mut().ok_or(LidarError::NotInitialized)?;
        let limits = loaded.settings.limits;

        let request = ScanRequest {
            timestamp: now,
            rays: &loaded.rays,
            range_max: limits.max,
        };
        let mut raw = backend.sample(&request).map_err(|e| {
            warn!("Lidar '{}' skipped tick at {:.3}s: {}", loaded.settings.name, now, e);
            e
        })?;
        if raw.len() != loaded.rays.len() {
            return Err(BackendError::SampleCountMismatch {
                expected: loaded.rays.len(),
                actual: raw.len(),
            }
            .into());
        }

        if let Some(noise) = loaded.noise.as_mut() {
            noise.apply(&mut raw, &limits);
        }
        let resampled = loaded.resampler.resample(&raw)?;
        let buffer = Arc::new(ScanBuffer::from_resampled(
            now,
            &loaded.settings.grid,
            raw,
            resampled,
        ));

        // Paused between the check above and here: keep the old scan.
        if !self.slot.publish(Arc::clone(&buffer)) {
            return Ok(UpdateOutcome::Skipped);
        }
        debug!(
            "Lidar '{}' updated at {:.3}s with {} ranges",
            loaded.settings.name,
            now,
            buffer.len()
        );

        if !self.callbacks.is_empty() {
            self.callbacks.emit(
                &buffer.frame(),
                buffer.width(),
                buffer.height(),
                FRAME_CHANNELS,
                FRAME_FORMAT,
            );
        }

        self.publish_lidar_scan(now)?;
        Ok(UpdateOutcome::Updated)
    }

    /// Sends the current scan as a `LaserScan`. A transport failure is
    /// logged and reported as `Ok(false)`.
    pub fn publish_lidar_scan(&mut self, now: f64) -> Result<bool, LidarError> {
        if self.lifecycle != Lifecycle::Initialized {
            return Err(LidarError::NotInitialized);
        }
        let message = self.laser_scan(now)?;
        let publisher = self.publisher.as_mut().ok_or(LidarError::NotInitialized)?;
        match publisher.send(&message) {
            Ok(()) => Ok(true),
            Err(e) => {
                warn!("Failed to publish scan of lidar '{}': {}", message.frame_id, e);
                Ok(false)
            }
        }
    }

    /// Builds the message for the current scan without sending it.
    pub fn laser_scan(&self, now: f64) -> Result<LaserScan, LidarError> {
        let loaded = self.loaded.as_ref().ok_or(LidarError::NotLoaded)?;
        let grid = &loaded.settings.grid;
        let scan = self.slot.snapshot();
        Ok(LaserScan {
            sensor_handle: self.handle,
            frame_id: loaded.settings.name.clone(),
            timestamp: now,
            world_pose: self.world_pose,
            angle_min: grid.angle_min(),
            angle_max: grid.angle_max(),
            angle_step: grid.angle_resolution(),
            count: grid.range_count(),
            vertical_angle_min: grid.vertical_angle_min(),
            vertical_angle_max: grid.vertical_angle_max(),
            vertical_angle_step: grid.vertical_angle_resolution(),
            vertical_count: grid.vertical_range_count(),
            range_min: loaded.settings.limits.min,
            range_max: loaded.settings.limits.max,
            ranges: scan.ranges().to_vec(),
            intensities: scan.intensities().to_vec(),
        })
    }

    /// Registers a callback run synchronously, inside `update`, for every
    /// new scan. Keep callbacks short.
    #[must_use = "dropping the connection immediately disconnects the callback"]
    pub fn connect_new_lidar_frame<F>(&self, callback: F) -> FrameConnection
    where
        F: Fn(&[f32], u32, u32, u32, &str) + Send + Sync + 'static,
    {
        self.callbacks.connect(callback)
    }

    // =====================================================================
    // == Scan Accessors ==
    // =====================================================================

    pub fn reader(&self) -> ScanReader {
        ScanReader::new(Arc::clone(&self.slot))
    }

    pub fn scan(&self) -> Arc<ScanBuffer> {
        self.slot.snapshot()
    }

    /// Range at `index`; `range_max` means no detection.
    pub fn range(&self, index: usize) -> Result<f64, LidarError> {
        self.slot.snapshot().range(index)
    }

    pub fn retro(&self, index: usize) -> Result<f64, LidarError> {
        self.slot.snapshot().retro(index)
    }

    pub fn fiducial(&self, index: usize) -> Result<i32, LidarError> {
        self.slot.snapshot().fiducial(index)
    }

    pub fn ranges(&self, out: &mut Vec<f64>) {
        self.slot.snapshot().ranges_into(out);
    }

    // =====================================================================
    // == Geometry & Metadata ==
    // =====================================================================

    pub fn settings(&self) -> Option<&SensorSettings> {
        self.loaded.as_ref().map(|l| &l.settings)
    }

    pub fn grid(&self) -> Option<&RayGrid> {
        self.settings().map(|s| &s.grid)
    }

    pub fn limits(&self) -> Option<&RangeLimits> {
        self.settings().map(|s| &s.limits)
    }

    pub fn name(&self) -> &str {
        self.settings().map_or("", |s| s.name.as_str())
    }

    pub fn topic(&self) -> &str {
        self.settings().map_or("", |s| s.topic.as_str())
    }

    pub fn update_rate(&self) -> f64 {
        self.settings().map_or(0.0, |s| s.update_rate)
    }

    pub fn rays(&self) -> &[SensorRay] {
        self.loaded.as_ref().map_or(&[], |l| l.rays.as_slice())
    }

    // --- Pass-through geometry: `None` until `load` succeeds ---

    pub fn range_min(&self) -> Option<f64> {
        self.limits().map(|l| l.min)
    }

    pub fn range_max(&self) -> Option<f64> {
        self.limits().map(|l| l.max)
    }

    pub fn range_resolution(&self) -> Option<f64> {
        self.limits().map(|l| l.resolution)
    }

    pub fn angle_min(&self) -> Option<f64> {
        self.grid().map(RayGrid::angle_min)
    }

    pub fn angle_max(&self) -> Option<f64> {
        self.grid().map(RayGrid::angle_max)
    }

    pub fn angle_resolution(&self) -> Option<f64> {
        self.grid().map(RayGrid::angle_resolution)
    }

    pub fn ray_count(&self) -> Option<u32> {
        self.grid().map(RayGrid::ray_count)
    }

    pub fn range_count(&self) -> Option<u32> {
        self.grid().map(RayGrid::range_count)
    }

    pub fn vertical_angle_min(&self) -> Option<f64> {
        self.grid().map(RayGrid::vertical_angle_min)
    }

    pub fn vertical_angle_max(&self) -> Option<f64> {
        self.grid().map(RayGrid::vertical_angle_max)
    }

    pub fn vertical_angle_resolution(&self) -> Option<f64> {
        self.grid().map(RayGrid::vertical_angle_resolution)
    }

    pub fn vertical_ray_count(&self) -> Option<u32> {
        self.grid().map(RayGrid::vertical_ray_count)
    }

    pub fn vertical_range_count(&self) -> Option<u32> {
        self.grid().map(RayGrid::vertical_range_count)
    }

    pub fn horizontal_fov(&self) -> Option<f64> {
        self.grid().map(RayGrid::horizontal_fov)
    }

    pub fn vertical_fov(&self) -> Option<f64> {
        self.grid().map(RayGrid::vertical_fov)
    }

    pub fn is_horizontal(&self) -> Option<bool> {
        self.grid().map(RayGrid::is_horizontal)
    }

    pub fn ray_count_ratio(&self) -> Option<f64> {
        self.grid().map(RayGrid::ray_count_ratio)
    }

    pub fn range_count_ratio(&self) -> Option<f64> {
        self.grid().map(RayGrid::range_count_ratio)
    }

    pub fn set_angle_min(&mut self, angle: f64) {
        self.edit_grid(|g| g.set_angle_min(angle));
    }

    pub fn set_angle_max(&mut self, angle: f64) {
        self.edit_grid(|g| g.set_angle_max(angle));
    }

    pub fn set_vertical_angle_min(&mut self, angle: f64) {
        self.edit_grid(|g| g.set_vertical_angle_min(angle));
    }

    pub fn set_vertical_angle_max(&mut self, angle: f64) {
        self.edit_grid(|g| g.set_vertical_angle_max(angle));
    }

    fn edit_grid(&mut self, edit: impl FnOnce(&mut RayGrid)) {
        match self.loaded.as_mut() {
            Some(loaded) => loaded.regrid(edit),
            None => warn!("Ignoring angle change on an unloaded lidar"),
        }
    }

    pub fn frame_handle(&self) -> FrameHandle {
        self.handle
    }

    pub fn set_frame_handle(&mut self, handle: FrameHandle) {
        self.handle = handle;
    }

    pub fn world_pose(&self) -> &Isometry3<f64> {
        &self.world_pose
    }

    pub fn set_world_pose(&mut self, pose: Isometry3<f64>) {
        self.world_pose = pose;
    }
}
