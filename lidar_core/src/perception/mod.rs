// lidar_core/src/perception/mod.rs

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;

/// Distance reported by a backend for a ray that hit nothing.
/// Any distance at or beyond the sensor's `range_max` means the same thing.
pub const NO_DETECTION: f64 = f64::INFINITY;

/// Fiducial id of a ray that did not hit a tagged object.
pub const NO_FIDUCIAL: i32 = -1;

/// Represents a single ray to be cast by the simulation engine.
/// All vectors are in the SENSOR's local coordinate frame.
#[derive(Debug, Clone)]
pub struct SensorRay {
    /// Row-major index of this ray within the ray grid.
    pub id: u32,
    /// The direction vector of the ray. Always a unit vector.
    pub direction: Vector3<f64>,
}

/// The result of casting a single ray.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Distance to the hit, or `NO_DETECTION`.
    pub distance: f64,
    /// Retro-reflectivity of the surface that was hit.
    pub intensity: f64,
    /// Identifier of the object that was hit, `NO_FIDUCIAL` if none.
    pub fiducial: i32,
}

impl RawSample {
    pub fn hit(distance: f64, intensity: f64) -> Self {
        Self {
            distance,
            intensity,
            fiducial: NO_FIDUCIAL,
        }
    }

    pub fn miss() -> Self {
        Self {
            distance: NO_DETECTION,
            intensity: 0.0,
            fiducial: NO_FIDUCIAL,
        }
    }

    pub fn with_fiducial(mut self, fiducial: i32) -> Self {
        self.fiducial = fiducial;
        self
    }
}

impl Default for RawSample {
    fn default() -> Self {
        Self::miss()
    }
}

/// Everything a backend needs to produce one tick of raw samples.
#[derive(Debug, Clone, Copy)]
pub struct ScanRequest<'a> {
    /// Simulation time of the tick, in seconds.
    pub timestamp: f64,
    /// Rays to cast, row-major over the ray grid.
    pub rays: &'a [SensorRay],
    /// Rays do not need to be traced past this distance.
    pub range_max: f64,
}

/// The contract for any scene-intersection engine that feeds a lidar.
///
/// Implementations must return exactly one `RawSample` per requested ray, in
/// the same order. Rays that hit nothing report `NO_DETECTION`.
pub trait IntersectionBackend {
    fn sample(&mut self, request: &ScanRequest<'_>) -> Result<Vec<RawSample>, BackendError>;
}

/// Wraps a closure as an `IntersectionBackend`; handy for tests and
/// scripted scenes.
#[derive(Debug, Clone)]
pub struct FnBackend<F>(pub F);

pub fn backend_fn<F>(f: F) -> FnBackend<F>
where
    F: FnMut(&ScanRequest<'_>) -> Result<Vec<RawSample>, BackendError>,
{
    FnBackend(f)
}

impl<F> IntersectionBackend for FnBackend<F>
where
    F: FnMut(&ScanRequest<'_>) -> Result<Vec<RawSample>, BackendError>,
{
    fn sample(&mut self, request: &ScanRequest<'_>) -> Result<Vec<RawSample>, BackendError> {
        (self.0)(request)
    }
}
