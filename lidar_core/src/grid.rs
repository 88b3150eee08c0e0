// lidar_core/src/grid.rs

//! Scan geometry: how many rays are cast, how many ranges are reported, and
//! over which angles.

use nalgebra::Vector3;
use tracing::warn;

use crate::error::ConfigError;
use crate::perception::SensorRay;

// =========================================================================
// == Single Axis ==
// =========================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn name(self) -> &'static str {
        match self {
            Axis::Horizontal => "horizontal",
            Axis::Vertical => "vertical",
        }
    }
}

/// Config field name prefixed with its axis, e.g. `horizontal.samples`.
macro_rules! axis_field {
    ($axis:expr, $field:literal) => {
        match $axis {
            $crate::grid::Axis::Horizontal => concat!("horizontal.", $field),
            $crate::grid::Axis::Vertical => concat!("vertical.", $field),
        }
    };
}
pub(crate) use axis_field;

/// One axis (horizontal or vertical) of the scan pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanAxis {
    ray_count: u32,
    range_count: u32,
    angle_min: f64,
    angle_max: f64,
}

impl ScanAxis {
    /// Validates and builds an axis. `axis` only names the axis in errors.
    pub fn new(
        axis: Axis,
        ray_count: u32,
        range_count: u32,
        angle_min: f64,
        angle_max: f64,
    ) -> Result<Self, ConfigError> {
        if ray_count == 0 {
            return Err(ConfigError::InvalidCount {
                field: axis_field!(axis, "samples"),
                value: 0,
            });
        }
        if range_count == 0 {
            return Err(ConfigError::InvalidCount {
                field: axis_field!(axis, "range_samples"),
                value: 0,
            });
        }
        let bounds = [
            (axis_field!(axis, "min_angle"), angle_min),
            (axis_field!(axis, "max_angle"), angle_max),
        ];
        for (field, value) in bounds {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { field, value });
            }
        }
        if angle_min > angle_max {
            return Err(ConfigError::InvertedAngles {
                axis: axis.name(),
                min: angle_min,
                max: angle_max,
            });
        }
        Ok(Self {
            ray_count,
            range_count,
            angle_min,
            angle_max,
        })
    }

    /// A degenerate single-ray axis at angle zero, used for planar scanners.
    pub fn single() -> Self {
        Self {
            ray_count: 1,
            range_count: 1,
            angle_min: 0.0,
            angle_max: 0.0,
        }
    }

    pub fn ray_count(&self) -> u32 {
        self.ray_count
    }

    pub fn range_count(&self) -> u32 {
        self.range_count
    }

    pub fn angle_min(&self) -> f64 {
        self.angle_min
    }

    pub fn angle_max(&self) -> f64 {
        self.angle_max
    }

    pub fn fov(&self) -> f64 {
        self.angle_max - self.angle_min
    }

    /// Radians between two consecutive reported ranges.
    pub fn angle_resolution(&self) -> f64 {
        self.fov() / f64::from(self.range_count.saturating_sub(1).max(1))
    }

    /// Radians between two consecutive simulated rays.
    pub fn ray_spacing(&self) -> f64 {
        self.fov() / f64::from(self.ray_count.saturating_sub(1).max(1))
    }

    /// `ray_count / range_count`: >1 downsamples, <1 upsamples, 1 passes through.
    pub fn ratio(&self) -> f64 {
        f64::from(self.ray_count) / f64::from(self.range_count)
    }

    /// Angle of the ray with the given index.
    pub fn ray_angle(&self, index: u32) -> f64 {
        self.angle_min + f64::from(index) * self.ray_spacing()
    }

    // Setters clamp instead of swapping, so `min <= max` always holds.
    fn set_angle_min(&mut self, axis: Axis, angle: f64) {
        if !angle.is_finite() {
            warn!("Ignoring non-finite {} min angle {}", axis.name(), angle);
            return;
        }
        if angle > self.angle_max {
            warn!(
                "{} min angle {} exceeds max {}; clamping to max",
                axis.name(),
                angle,
                self.angle_max
            );
        }
        self.angle_min = angle.min(self.angle_max);
    }

    fn set_angle_max(&mut self, axis: Axis, angle: f64) {
        if !angle.is_finite() {
            warn!("Ignoring non-finite {} max angle {}", axis.name(), angle);
            return;
        }
        if angle < self.angle_min {
            warn!(
                "{} max angle {} is below min {}; clamping to min",
                axis.name(),
                angle,
                self.angle_min
            );
        }
        self.angle_max = angle.max(self.angle_min);
    }
}

// =========================================================================
// == Full Ray Grid ==
// =========================================================================

/// The horizontal x vertical scan pattern of a lidar.
///
/// Rays are what the intersection backend simulates; ranges are what the
/// sensor reports. The two counts are independent per axis and the ratio
/// between them drives the resampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayGrid {
    horizontal: ScanAxis,
    vertical: ScanAxis,
}

impl RayGrid {
    pub fn new(horizontal: ScanAxis, vertical: ScanAxis) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// A planar scanner with the same number of rays and ranges.
    pub fn planar(count: u32, angle_min: f64, angle_max: f64) -> Result<Self, ConfigError> {
        Ok(Self::new(
            ScanAxis::new(Axis::Horizontal, count, count, angle_min, angle_max)?,
            ScanAxis::single(),
        ))
    }

    pub fn horizontal(&self) -> &ScanAxis {
        &self.horizontal
    }

    pub fn vertical(&self) -> &ScanAxis {
        &self.vertical
    }

    pub fn ray_count(&self) -> u32 {
        self.horizontal.ray_count
    }

    pub fn range_count(&self) -> u32 {
        self.horizontal.range_count
    }

    pub fn vertical_ray_count(&self) -> u32 {
        self.vertical.ray_count
    }

    pub fn vertical_range_count(&self) -> u32 {
        self.vertical.range_count
    }

    /// Number of simulated rays in the whole grid.
    pub fn total_rays(&self) -> usize {
        self.horizontal.ray_count as usize * self.vertical.ray_count as usize
    }

    /// Number of reported ranges in the whole grid.
    pub fn total_ranges(&self) -> usize {
        self.horizontal.range_count as usize * self.vertical.range_count as usize
    }

    pub fn angle_min(&self) -> f64 {
        self.horizontal.angle_min
    }

    pub fn angle_max(&self) -> f64 {
        self.horizontal.angle_max
    }

    pub fn vertical_angle_min(&self) -> f64 {
        self.vertical.angle_min
    }

    pub fn vertical_angle_max(&self) -> f64 {
        self.vertical.angle_max
    }

    pub fn set_angle_min(&mut self, angle: f64) {
        self.horizontal.set_angle_min(Axis::Horizontal, angle);
    }

    pub fn set_angle_max(&mut self, angle: f64) {
        self.horizontal.set_angle_max(Axis::Horizontal, angle);
    }

    pub fn set_vertical_angle_min(&mut self, angle: f64) {
        self.vertical.set_angle_min(Axis::Vertical, angle);
    }

    pub fn set_vertical_angle_max(&mut self, angle: f64) {
        self.vertical.set_angle_max(Axis::Vertical, angle);
    }

    pub fn angle_resolution(&self) -> f64 {
        self.horizontal.angle_resolution()
    }

    pub fn vertical_angle_resolution(&self) -> f64 {
        self.vertical.angle_resolution()
    }

    pub fn horizontal_fov(&self) -> f64 {
        self.horizontal.fov()
    }

    pub fn vertical_fov(&self) -> f64 {
        self.vertical.fov()
    }

    /// Horizontal `ray_count / range_count`.
    pub fn horizontal_ratio(&self) -> f64 {
        self.horizontal.ratio()
    }

    /// Vertical `ray_count / range_count`.
    pub fn vertical_ratio(&self) -> f64 {
        self.vertical.ratio()
    }

    /// Horizontal ray count over vertical ray count.
    pub fn ray_count_ratio(&self) -> f64 {
        f64::from(self.horizontal.ray_count) / f64::from(self.vertical.ray_count)
    }

    /// Horizontal range count over vertical range count.
    pub fn range_count_ratio(&self) -> f64 {
        f64::from(self.horizontal.range_count) / f64::from(self.vertical.range_count)
    }

    pub fn is_horizontal(&self) -> bool {
        self.vertical.ray_count <= 1
    }

    /// Every ray of the grid as `(yaw, pitch)`, row-major: one row per
    /// vertical ray, `ray_count` columns per row.
    pub fn ray_angles(&self) -> Vec<(f64, f64)> {
        let mut angles = Vec::with_capacity(self.total_rays());
        for row in 0..self.vertical.ray_count {
            let pitch = self.vertical.ray_angle(row);
            for col in 0..self.horizontal.ray_count {
                angles.push((self.horizontal.ray_angle(col), pitch));
            }
        }
        angles
    }

    /// Unit ray directions in the sensor frame (+X forward, +Y left, +Z up),
    /// in the same order as `ray_angles`.
    pub fn rays(&self) -> Vec<SensorRay> {
        self.ray_angles()
            .into_iter()
            .enumerate()
            .map(|(id, (yaw, pitch))| SensorRay {
                id: id as u32,
                direction: Vector3::new(
                    pitch.cos() * yaw.cos(),
                    pitch.cos() * yaw.sin(),
                    pitch.sin(),
                ),
            })
            .collect()
    }
}
