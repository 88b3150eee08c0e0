// lidar_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::perception::{
    backend_fn, IntersectionBackend, RawSample, ScanRequest, SensorRay, NO_DETECTION,
    NO_FIDUCIAL,
};
pub use crate::transport::{ScanPublisher, TopicPublisher, TopicReader};

// --- Core Data Structures ---
pub use crate::config::{AxisConfig, LidarConfig, NoiseConfig, RangeConfig};
pub use crate::error::{BackendError, ConfigError, LidarError, TransportError};
pub use crate::grid::{Axis, RayGrid, ScanAxis};
pub use crate::messages::{FrameHandle, LaserScan};
pub use crate::resample::{RangeLimits, RangeResampler};
pub use crate::scan::{ScanBuffer, ScanReader};

// --- The Sensor ---
pub use crate::callbacks::FrameConnection;
pub use crate::sensor::{LidarSensor, SensorState, UpdateOutcome};
