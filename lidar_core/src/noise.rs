// lidar_core/src/noise.rs

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::config::NoiseConfig;
use crate::error::ConfigError;
use crate::perception::RawSample;
use crate::resample::RangeLimits;

/// Additive Gaussian noise on ray distances.
///
/// Only real detections are perturbed; misses stay misses. A fixed seed
/// makes the noise sequence reproducible across runs.
#[derive(Debug, Clone)]
pub struct RangeNoise {
    distribution: Normal<f64>,
    rng: ChaCha8Rng,
}

impl RangeNoise {
    pub fn new(config: &NoiseConfig) -> Result<Self, ConfigError> {
        if !config.mean.is_finite() || !config.stddev.is_finite() || config.stddev < 0.0 {
            return Err(ConfigError::InvalidNoise(format!(
                "mean {} / stddev {}",
                config.mean, config.stddev
            )));
        }
        let distribution = Normal::new(config.mean, config.stddev)
            .map_err(|e| ConfigError::InvalidNoise(e.to_string()))?;
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Ok(Self { distribution, rng })
    }

    /// Perturbs every detection in place, never below zero.
    pub fn apply(&mut self, samples: &mut [RawSample], limits: &RangeLimits) {
        for sample in samples.iter_mut() {
            if limits.is_detection(sample.distance) {
                let noisy = sample.distance + self.distribution.sample(&mut self.rng);
                sample.distance = noisy.max(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: RangeLimits = RangeLimits {
        min: 0.1,
        max: 10.0,
        resolution: 0.0,
    };

    fn config(seed: u64) -> NoiseConfig {
        NoiseConfig {
            mean: 0.0,
            stddev: 0.05,
            seed: Some(seed),
        }
    }

    #[test]
    fn same_seed_same_noise() {
        let mut a = vec![RawSample::hit(5.0, 1.0); 16];
        let mut b = a.clone();
        RangeNoise::new(&config(7)).unwrap().apply(&mut a, &LIMITS);
        RangeNoise::new(&config(7)).unwrap().apply(&mut b, &LIMITS);
        assert_eq!(a, b);
        assert!(a.iter().any(|s| s.distance != 5.0));
    }

    #[test]
    fn misses_are_not_perturbed() {
        let mut samples = vec![RawSample::miss(), RawSample::hit(12.0, 0.0)];
        RangeNoise::new(&config(1)).unwrap().apply(&mut samples, &LIMITS);
        assert!(samples[0].distance.is_infinite());
        assert_eq!(samples[1].distance, 12.0);
    }

    #[test]
    fn negative_stddev_is_rejected() {
        let bad = NoiseConfig {
            mean: 0.0,
            stddev: -1.0,
            seed: None,
        };
        assert!(matches!(
            RangeNoise::new(&bad),
            Err(ConfigError::InvalidNoise(_))
        ));
    }
}
