// lidar_core/src/messages.rs

use nalgebra::Isometry3;
use serde::{Deserialize, Serialize};

/// Pixel format tag passed to frame callbacks: three `f32` channels per range.
pub const FRAME_FORMAT: &str = "PF_FLOAT32_RGB";

// --- Core Identifier ---
/// Opaque handle of the frame (entity) a sensor is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FrameHandle(pub u64);

impl FrameHandle {
    // Conversions for the Bevy adapter crate.
    #[cfg(feature = "bevy")]
    pub fn from_entity(entity: bevy_ecs::prelude::Entity) -> Self {
        Self(entity.to_bits())
    }

    #[cfg(feature = "bevy")]
    pub fn to_entity(self) -> bevy_ecs::prelude::Entity {
        bevy_ecs::prelude::Entity::from_bits(self.0)
    }
}

// =========================================================================
// == Laser Scan Message ==
// =========================================================================

/// The message published once per successful sensor update.
///
/// Ranges and intensities are row-major: `vertical_count` rows of `count`
/// values each. Encoding on the wire is left to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    pub sensor_handle: FrameHandle,
    pub frame_id: String,
    /// Simulation time of the scan, in seconds.
    pub timestamp: f64,
    /// Pose of the sensor in the world frame (ENU).
    pub world_pose: Isometry3<f64>,

    pub angle_min: f64,
    pub angle_max: f64,
    pub angle_step: f64,
    pub count: u32,

    pub vertical_angle_min: f64,
    pub vertical_angle_max: f64,
    pub vertical_angle_step: f64,
    pub vertical_count: u32,

    pub range_min: f64,
    pub range_max: f64,
    pub ranges: Vec<f64>,
    pub intensities: Vec<f64>,
}

impl LaserScan {
    /// Range at a (column, row) position of the scan.
    pub fn range_at(&self, column: u32, row: u32) -> Option<f64> {
        if column >= self.count || row >= self.vertical_count {
            return None;
        }
        self.ranges
            .get(row as usize * self.count as usize + column as usize)
            .copied()
    }

    /// Number of ranges that hit something inside the sensor's reach.
    pub fn detection_count(&self) -> usize {
        self.ranges.iter().filter(|r| **r < self.range_max).count()
    }
}
