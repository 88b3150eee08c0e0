// lidar_core/src/resample.rs

//! Ray-to-range resampling.
//!
//! Each output index `o` on an axis sits at the fractional ray position
//! `o * ray_count / range_count`. Downsampled axes pick the nearest ray,
//! upsampled axes interpolate linearly between the two rays around that
//! position, and equal counts pass straight through. The two axes combine
//! separably.

use serde::{Deserialize, Serialize};

use crate::error::ResampleError;
use crate::grid::{RayGrid, ScanAxis};
use crate::perception::{RawSample, NO_FIDUCIAL};

/// Distance limits of the sensor, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeLimits {
    pub min: f64,
    pub max: f64,
    /// Distance quantum reported by the device. Informational only.
    pub resolution: f64,
}

impl RangeLimits {
    /// True if the raw distance is a real hit inside the sensor's reach.
    pub fn is_detection(&self, distance: f64) -> bool {
        distance.is_finite() && distance < self.max
    }
}

/// Output arrays of one resampled scan, row-major over the range grid.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResampledScan {
    pub ranges: Vec<f64>,
    pub intensities: Vec<f64>,
    pub fiducials: Vec<i32>,
}

/// Where an output index reads from along one axis.
/// `weight` is the share taken from `hi`; `lo` gets the rest.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tap {
    lo: usize,
    hi: usize,
    weight: f64,
}

fn axis_taps(axis: &ScanAxis) -> Vec<Tap> {
    let rays = axis.ray_count() as usize;
    let ranges = axis.range_count() as usize;
    let last = rays - 1;
    let ratio = axis.ratio();

    (0..ranges)
        .map(|o| {
            if rays == ranges {
                Tap {
                    lo: o,
                    hi: o,
                    weight: 0.0,
                }
            } else if rays > ranges {
                let nearest = ((o as f64 * ratio).round() as usize).min(last);
                Tap {
                    lo: nearest,
                    hi: nearest,
                    weight: 0.0,
                }
            } else {
                let position = o as f64 * ratio;
                let lo = (position.floor() as usize).min(last);
                let hi = (lo + 1).min(last);
                let weight = if hi == lo { 0.0 } else { position - lo as f64 };
                Tap { lo, hi, weight }
            }
        })
        .collect()
}

/// A raw sample after clamping to the sensor limits.
#[derive(Debug, Clone, Copy)]
struct Clamped {
    range: f64,
    intensity: f64,
    fiducial: i32,
    detected: bool,
}

impl Clamped {
    fn new(sample: &RawSample, limits: &RangeLimits) -> Self {
        let detected = limits.is_detection(sample.distance);
        let intensity = if sample.intensity.is_finite() && sample.intensity > 0.0 {
            sample.intensity
        } else {
            0.0
        };
        Self {
            range: if detected {
                sample.distance.max(limits.min)
            } else {
                limits.max
            },
            intensity,
            fiducial: if detected { sample.fiducial } else { NO_FIDUCIAL },
            detected,
        }
    }
}

/// Maps raw ray samples onto the range grid of a `RayGrid`.
#[derive(Debug, Clone)]
pub struct RangeResampler {
    grid: RayGrid,
    limits: RangeLimits,
    horizontal: Vec<Tap>,
    vertical: Vec<Tap>,
}

impl RangeResampler {
    /// Precomputes the per-axis taps; the ray/range ratios are fixed from here on.
    pub fn new(grid: RayGrid, limits: RangeLimits) -> Self {
        Self {
            horizontal: axis_taps(grid.horizontal()),
            vertical: axis_taps(grid.vertical()),
            grid,
            limits,
        }
    }

    /// Resamples a full `ray_count x vertical_ray_count` raw grid.
    pub fn resample(&self, raw: &[RawSample]) -> Result<ResampledScan, ResampleError> {
        let expected = self.grid.total_rays();
        if raw.len() != expected {
            return Err(ResampleError::InputSize {
                expected,
                actual: raw.len(),
            });
        }

        let total = self.grid.total_ranges();
        let mut out = ResampledScan {
            ranges: Vec::with_capacity(total),
            intensities: Vec::with_capacity(total),
            fiducials: Vec::with_capacity(total),
        };

        let row_len = self.grid.ray_count() as usize;
        let clamped: Vec<Clamped> = raw.iter().map(|s| Clamped::new(s, &self.limits)).collect();

        for v in &self.vertical {
            let row_lo = &clamped[v.lo * row_len..(v.lo + 1) * row_len];
            let row_hi = &clamped[v.hi * row_len..(v.hi + 1) * row_len];
            for h in &self.horizontal {
                let (range, intensity, fiducial) = self.blend(
                    [
                        (row_lo[h.lo], (1.0 - v.weight) * (1.0 - h.weight)),
                        (row_lo[h.hi], (1.0 - v.weight) * h.weight),
                        (row_hi[h.lo], v.weight * (1.0 - h.weight)),
                        (row_hi[h.hi], v.weight * h.weight),
                    ],
                );
                out.ranges.push(range);
                out.intensities.push(intensity);
                out.fiducials.push(fiducial);
            }
        }

        Ok(out)
    }

    // Interpolates only between real detections. If any contributing sample
    // is a no-detection, the nearest contributor is used as is.
    fn blend(&self, taps: [(Clamped, f64); 4]) -> (f64, f64, i32) {
        let mut nearest = taps[0];
        let mut all_detected = true;
        let mut range = 0.0;
        let mut intensity = 0.0;

        for (sample, weight) in taps.iter().copied() {
            if weight <= 0.0 {
                continue;
            }
            if weight > nearest.1 {
                nearest = (sample, weight);
            }
            all_detected &= sample.detected;
            range += sample.range * weight;
            intensity += sample.intensity * weight;
        }

        let (sample, _) = nearest;
        if !all_detected {
            return (sample.range, sample.intensity, sample.fiducial);
        }
        let range = range.clamp(self.limits.min, self.limits.max);
        (range, intensity, sample.fiducial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Axis;
    use crate::perception::NO_DETECTION;
    use approx::assert_abs_diff_eq;

    const LIMITS: RangeLimits = RangeLimits {
        min: 0.1,
        max: 10.0,
        resolution: 0.0,
    };

    fn planar(rays: u32, ranges: u32) -> RayGrid {
        RayGrid::new(
            ScanAxis::new(Axis::Horizontal, rays, ranges, -1.0, 1.0).unwrap(),
            ScanAxis::single(),
        )
    }

    fn hits(distances: &[f64]) -> Vec<RawSample> {
        distances.iter().map(|&d| RawSample::hit(d, d * 10.0)).collect()
    }

    #[test]
    fn equal_counts_pass_through() {
        let raw = hits(&[0.5, 1.25, 3.0, 7.5, 9.9]);
        let out = RangeResampler::new(planar(5, 5), LIMITS).resample(&raw).unwrap();
        let expected: Vec<f64> = raw.iter().map(|s| s.distance).collect();
        let intensities: Vec<f64> = raw.iter().map(|s| s.intensity).collect();
        assert_eq!(out.ranges, expected);
        assert_eq!(out.intensities, intensities);
    }

    #[test]
    fn downsampling_picks_nearest_rays() {
        let raw = hits(&[1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 4.0, 4.0]);
        let out = RangeResampler::new(planar(8, 4), LIMITS).resample(&raw).unwrap();
        assert_eq!(out.ranges, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn downsampling_never_invents_values() {
        let raw = hits(&[1.1, 2.7, 3.3, 0.4, 5.9, 6.2, 7.8]);
        for ranges in 1..7 {
            let out = RangeResampler::new(planar(7, ranges), LIMITS)
                .resample(&raw)
                .unwrap();
            assert_eq!(out.ranges.len(), ranges as usize);
            for value in &out.ranges {
                assert!(raw.iter().any(|s| s.distance == *value), "{value} invented");
            }
        }
    }

    #[test]
    fn downsampling_rounds_to_nearest() {
        // ratio 5/3: positions 0, 1.67, 3.33 -> rays 0, 2, 3
        let raw = hits(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let out = RangeResampler::new(planar(5, 3), LIMITS).resample(&raw).unwrap();
        assert_eq!(out.ranges, vec![1.0, 3.0, 4.0]);
    }

    #[test]
    fn upsampling_interpolates_between_neighbours() {
        let raw = hits(&[1.0, 2.0, 3.0, 4.0]);
        let out = RangeResampler::new(planar(4, 8), LIMITS).resample(&raw).unwrap();
        assert_eq!(out.ranges.len(), 8);
        assert_abs_diff_eq!(out.ranges[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.ranges[1], 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out.ranges[2], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.intensities[1], 15.0, epsilon = 1e-12);
        // Past the last ray there is nothing to interpolate towards.
        assert_abs_diff_eq!(out.ranges[7], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn upsampled_values_stay_within_neighbour_bounds() {
        let raw = hits(&[0.05, 9.0, 2.0, 15.0, 4.0]);
        let limits = LIMITS;
        let out = RangeResampler::new(planar(5, 13), limits).resample(&raw).unwrap();
        let ratio = 5.0 / 13.0;
        for (o, value) in out.ranges.iter().enumerate() {
            let p = o as f64 * ratio;
            let lo = (p.floor() as usize).min(4);
            let hi = (lo + 1).min(4);
            let a = raw[lo].distance.clamp(limits.min, limits.max);
            let b = raw[hi].distance.clamp(limits.min, limits.max);
            assert!(*value >= a.min(b) - 1e-12 && *value <= a.max(b) + 1e-12);
        }
    }

    #[test]
    fn fiducial_comes_from_nearer_neighbour() {
        let raw = vec![
            RawSample::hit(1.0, 1.0).with_fiducial(7),
            RawSample::hit(2.0, 1.0).with_fiducial(9),
        ];
        // ratio 2/5: positions 0, 0.4, 0.8, 1.2, 1.6
        let out = RangeResampler::new(planar(2, 5), LIMITS).resample(&raw).unwrap();
        assert_eq!(out.fiducials, vec![7, 7, 9, 9, 9]);
    }

    #[test]
    fn no_detection_reports_range_max() {
        let raw = vec![
            RawSample::hit(2.0, 1.0),
            RawSample::miss(),
            RawSample::hit(25.0, 1.0),
            RawSample::hit(f64::NAN, 1.0),
        ];
        let out = RangeResampler::new(planar(4, 4), LIMITS).resample(&raw).unwrap();
        assert_eq!(out.ranges, vec![2.0, 10.0, 10.0, 10.0]);
        assert_eq!(out.fiducials[1], NO_FIDUCIAL);
    }

    #[test]
    fn no_detection_is_never_blended_with_a_hit() {
        let raw = vec![RawSample::hit(2.0, 5.0), RawSample::hit(NO_DETECTION, 0.0)];
        let out = RangeResampler::new(planar(2, 4), LIMITS).resample(&raw).unwrap();
        // positions 0, 0.5, 1.0 (clamped), 1.5 (clamped)
        assert_eq!(out.ranges[0], 2.0);
        assert_eq!(out.ranges[1], 2.0);
        assert_eq!(out.ranges[2], 10.0);
        assert_eq!(out.ranges[3], 10.0);
        assert_eq!(out.intensities[1], 5.0);
    }

    #[test]
    fn short_ranges_report_range_min() {
        let raw = hits(&[0.0, 0.01, 0.5]);
        let out = RangeResampler::new(planar(3, 3), LIMITS).resample(&raw).unwrap();
        assert_eq!(out.ranges, vec![0.1, 0.1, 0.5]);
    }

    #[test]
    fn vertical_axis_is_resampled_by_rows() {
        let grid = RayGrid::new(
            ScanAxis::new(Axis::Horizontal, 2, 2, -1.0, 1.0).unwrap(),
            ScanAxis::new(Axis::Vertical, 2, 3, -0.1, 0.1).unwrap(),
        );
        let raw = hits(&[1.0, 2.0, 3.0, 4.0]);
        let out = RangeResampler::new(grid, LIMITS).resample(&raw).unwrap();
        // vertical positions 0, 0.67, 1.33 (clamped to row 1)
        assert_eq!(out.ranges.len(), 6);
        assert_abs_diff_eq!(out.ranges[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.ranges[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.ranges[2], 1.0 + 2.0 * 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.ranges[3], 2.0 + 2.0 * 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.ranges[4], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.ranges[5], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn wrong_input_size_is_rejected() {
        let err = RangeResampler::new(planar(4, 4), LIMITS)
            .resample(&hits(&[1.0, 2.0]))
            .unwrap_err();
        assert_eq!(
            err,
            ResampleError::InputSize {
                expected: 4,
                actual: 2
            }
        );
    }
}
