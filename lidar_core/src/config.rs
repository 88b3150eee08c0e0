// lidar_core/src/config.rs

//! Load-time configuration of a lidar and its validation.
//!
//! The structs deserialize from any serde format; the simulator reads them
//! from a scenario TOML. Validation turns them into the geometry types the
//! sensor runs on.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grid::{axis_field, Axis, RayGrid, ScanAxis};
use crate::resample::RangeLimits;

fn default_topic() -> String {
    "/lidar".to_string()
}

fn default_update_rate() -> f64 {
    10.0
}

fn default_resolution() -> f64 {
    1.0
}

fn default_vertical() -> AxisConfig {
    AxisConfig {
        samples: 1,
        resolution: 1.0,
        min_angle: 0.0,
        max_angle: 0.0,
        range_samples: None,
    }
}

// =========================================================================
// == Configuration Structs ==
// =========================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LidarConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Scans per second. Zero means every simulation tick.
    #[serde(default = "default_update_rate")]
    pub update_rate: f64,
    #[serde(default)]
    pub horizontal: Option<AxisConfig>,
    #[serde(default = "default_vertical")]
    pub vertical: AxisConfig,
    #[serde(default)]
    pub range: Option<RangeConfig>,
    #[serde(default)]
    pub noise: Option<NoiseConfig>,
}

/// One scan axis. Angles are in radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisConfig {
    /// Number of simulated rays.
    pub samples: u32,
    /// Reported ranges per simulated ray. Ignored when `range_samples` is set.
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    #[serde(default)]
    pub min_angle: f64,
    #[serde(default)]
    pub max_angle: f64,
    /// Explicit number of reported ranges.
    #[serde(default)]
    pub range_samples: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeConfig {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub resolution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoiseConfig {
    #[serde(default)]
    pub mean: f64,
    pub stddev: f64,
    /// Fixed seed for reproducible noise; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// A validated configuration, ready to drive a sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSettings {
    pub name: String,
    pub topic: String,
    pub update_rate: f64,
    pub grid: RayGrid,
    pub limits: RangeLimits,
    pub noise: Option<NoiseConfig>,
}

// =========================================================================
// == Validation ==
// =========================================================================

impl AxisConfig {
    /// Number of ranges this axis reports.
    pub fn range_count(&self, axis: Axis) -> Result<u32, ConfigError> {
        if let Some(count) = self.range_samples {
            return Ok(count);
        }
        if !self.resolution.is_finite() {
            return Err(ConfigError::NonFinite {
                field: axis_field!(axis, "resolution"),
                value: self.resolution,
            });
        }
        if self.resolution <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: axis_field!(axis, "resolution"),
                value: self.resolution,
            });
        }
        let count = (f64::from(self.samples) * self.resolution).round();
        if count < 1.0 || count > f64::from(u32::MAX) {
            return Err(ConfigError::InvalidCount {
                field: axis_field!(axis, "range_samples"),
                value: count.max(0.0) as u64,
            });
        }
        Ok(count as u32)
    }

    fn to_axis(&self, axis: Axis) -> Result<ScanAxis, ConfigError> {
        ScanAxis::new(
            axis,
            self.samples,
            self.range_count(axis)?,
            self.min_angle,
            self.max_angle,
        )
    }
}

impl RangeConfig {
    pub fn to_limits(&self) -> Result<RangeLimits, ConfigError> {
        let valid = self.min.is_finite()
            && self.max.is_finite()
            && self.min >= 0.0
            && self.min < self.max;
        if !valid {
            return Err(ConfigError::InvalidRangeLimits {
                min: self.min,
                max: self.max,
            });
        }
        if !self.resolution.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "range.resolution",
                value: self.resolution,
            });
        }
        if self.resolution < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "range.resolution",
                value: self.resolution,
            });
        }
        Ok(RangeLimits {
            min: self.min,
            max: self.max,
            resolution: self.resolution,
        })
    }
}

impl LidarConfig {
    /// A planar scanner with one range per ray.
    pub fn planar(
        name: &str,
        samples: u32,
        angles: (f64, f64),
        range: (f64, f64),
    ) -> Self {
        Self {
            name: name.to_string(),
            topic: default_topic(),
            update_rate: default_update_rate(),
            horizontal: Some(AxisConfig {
                samples,
                resolution: 1.0,
                min_angle: angles.0,
                max_angle: angles.1,
                range_samples: None,
            }),
            vertical: default_vertical(),
            range: Some(RangeConfig {
                min: range.0,
                max: range.1,
                resolution: 0.0,
            }),
            noise: None,
        }
    }

    pub fn validate(&self) -> Result<SensorSettings, ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::MissingField("name"));
        }
        let horizontal = self
            .horizontal
            .as_ref()
            .ok_or(ConfigError::MissingField("horizontal"))?;
        let range = self
            .range
            .as_ref()
            .ok_or(ConfigError::MissingField("range"))?;
        if !self.update_rate.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "update_rate",
                value: self.update_rate,
            });
        }
        if self.update_rate < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "update_rate",
                value: self.update_rate,
            });
        }

        let grid = RayGrid::new(
            horizontal.to_axis(Axis::Horizontal)?,
            self.vertical.to_axis(Axis::Vertical)?,
        );

        Ok(SensorSettings {
            name: self.name.clone(),
            topic: self.topic.clone(),
            update_rate: self.update_rate,
            grid,
            limits: range.to_limits()?,
            noise: self.noise.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> LidarConfig {
        LidarConfig::planar("front", 640, (-1.0, 1.0), (0.1, 30.0))
    }

    #[test]
    fn planar_config_validates() {
        let settings = base().validate().unwrap();
        assert_eq!(settings.grid.ray_count(), 640);
        assert_eq!(settings.grid.range_count(), 640);
        assert_eq!(settings.grid.vertical_ray_count(), 1);
        assert!(settings.grid.is_horizontal());
        assert_eq!(settings.topic, "/lidar");
        assert_eq!(settings.limits.max, 30.0);
    }

    #[test]
    fn resolution_scales_range_count() {
        let mut config = base();
        if let Some(h) = config.horizontal.as_mut() {
            h.resolution = 0.5;
        }
        assert_eq!(config.validate().unwrap().grid.range_count(), 320);

        if let Some(h) = config.horizontal.as_mut() {
            h.range_samples = Some(100);
        }
        assert_eq!(config.validate().unwrap().grid.range_count(), 100);
    }

    #[test]
    fn missing_sections_are_reported() {
        let mut config = base();
        config.horizontal = None;
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingField("horizontal"))
        );

        let mut config = base();
        config.range = None;
        assert_eq!(config.validate(), Err(ConfigError::MissingField("range")));

        let mut config = base();
        config.name.clear();
        assert_eq!(config.validate(), Err(ConfigError::MissingField("name")));
    }

    #[test]
    fn invalid_values_are_reported() {
        let mut config = base();
        if let Some(h) = config.horizontal.as_mut() {
            h.samples = 0;
        }
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCount { .. })
        ));

        let mut config = base();
        if let Some(h) = config.horizontal.as_mut() {
            h.min_angle = 2.0;
        }
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvertedAngles { .. })
        ));

        let mut config = base();
        config.range = Some(RangeConfig {
            min: 5.0,
            max: 1.0,
            resolution: 0.0,
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRangeLimits { .. })
        ));

        let mut config = base();
        if let Some(h) = config.horizontal.as_mut() {
            h.resolution = 0.0001;
        }
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCount { .. })
        ));
    }

    #[test]
    fn out_of_range_values_are_not_reported_as_non_finite() {
        let mut config = base();
        if let Some(h) = config.horizontal.as_mut() {
            h.resolution = 0.0;
        }
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "horizontal.resolution",
                value: 0.0
            })
        );

        let mut config = base();
        config.vertical.resolution = f64::NAN;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFinite {
                field: "vertical.resolution",
                ..
            })
        ));

        let mut config = base();
        config.update_rate = -1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "update_rate",
                value: -1.0
            })
        );
        config.update_rate = f64::INFINITY;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonFinite {
                field: "update_rate",
                ..
            })
        ));

        let mut config = base();
        if let Some(r) = config.range.as_mut() {
            r.resolution = -0.01;
        }
        let err = config.validate().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                field: "range.resolution",
                value: -0.01
            }
        );
        assert_eq!(
            err.to_string(),
            "`range.resolution` is out of range, got -0.01"
        );
    }
}
