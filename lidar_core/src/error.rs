// lidar_core/src/error.rs

use thiserror::Error;

use crate::sensor::SensorState;

/// Problems found while validating a `LidarConfig`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("`{field}` must be a positive count, got {value}")]
    InvalidCount { field: &'static str, value: u64 },
    #[error("`{field}` must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },
    #[error("`{field}` is out of range, got {value}")]
    InvalidValue { field: &'static str, value: f64 },
    #[error("{axis} angle bounds are inverted: min {min} > max {max}")]
    InvertedAngles {
        axis: &'static str,
        min: f64,
        max: f64,
    },
    #[error("invalid range limits: min {min}, max {max} (need 0 <= min < max)")]
    InvalidRangeLimits { min: f64, max: f64 },
    #[error("invalid noise parameters: {0}")]
    InvalidNoise(String),
}

/// Failure reported by an intersection backend for a single tick.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    #[error("scene is not ready for raycasting")]
    SceneNotReady,
    #[error("backend returned {actual} samples, expected {expected}")]
    SampleCountMismatch { expected: usize, actual: usize },
    #[error("backend failure: {0}")]
    Other(String),
}

/// Failure to hand a message to the publish channel.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("topic '{0}' is closed")]
    Closed(String),
    #[error("transport failure: {0}")]
    Other(String),
}

/// The raw buffer handed to the resampler does not match the ray grid.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResampleError {
    #[error("raw buffer holds {actual} samples, ray grid needs {expected}")]
    InputSize { expected: usize, actual: usize },
}

/// Top-level error type of the lidar sensor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LidarError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("sensor has not been loaded")]
    NotLoaded,
    #[error("sensor has not been initialized")]
    NotInitialized,
    #[error("cannot {operation} a sensor that is {state:?}")]
    InvalidState {
        operation: &'static str,
        state: SensorState,
    },
    #[error("intersection backend unavailable: {0}")]
    BackendUnavailable(#[from] BackendError),
    #[error("index {index} out of range for scan of {len} values")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<ResampleError> for LidarError {
    fn from(err: ResampleError) -> Self {
        match err {
            ResampleError::InputSize { expected, actual } => {
                LidarError::BackendUnavailable(BackendError::SampleCountMismatch {
                    expected,
                    actual,
                })
            }
        }
    }
}
