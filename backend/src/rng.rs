use std::{cell::RefCell, ops::RangeInclusive};

use rand::{Rng as _, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

/// A seeded random generator shared by systems that need randomized timing.
#[derive(Debug, Clone)]
pub struct Rng {
    inner: RefCell<StdRng>,
}

impl Rng {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            inner: RefCell::new(StdRng::from_seed(seed)),
        }
    }

    pub fn random_range(&self, range: RangeInclusive<u64>) -> u64 {
        self.inner.borrow_mut().random_range(range)
    }

    pub fn random_bool(&self, probability: f64) -> bool {
        self.inner.borrow_mut().random_bool(probability.clamp(0.0, 1.0))
    }

    /// Samples a delay in milliseconds from `N(mean, std)` clamped to `[min, max]` and converts it
    /// to ticks of `ms_per_tick`.
    pub fn random_delay_tick_count(
        &self,
        mean: f32,
        std: f32,
        ms_per_tick: f32,
        min: f32,
        max: f32,
    ) -> (f32, u32) {
        let millis = Normal::new(mean, std.max(f32::EPSILON))
            .map(|normal| normal.sample(&mut *self.inner.borrow_mut()))
            .unwrap_or(mean)
            .clamp(min, max);

        (millis, (millis / ms_per_tick).round() as u32)
    }

    /// Generates the next `(mean, std)` pair drifting around the base values.
    ///
    /// Each component reverts toward its base by `reversion_rate` and receives Gaussian noise
    /// scaled by `volatility`.
    pub fn random_mean_std_pair(
        &self,
        base_mean: f32,
        mean: f32,
        base_std: f32,
        std: f32,
        reversion_rate: f32,
        volatility: f32,
    ) -> (f32, f32) {
        let Ok(noise) = Normal::new(0.0f32, 1.0) else {
            return (base_mean, base_std);
        };
        let mut rng = self.inner.borrow_mut();
        let mean =
            mean + reversion_rate * (base_mean - mean) + volatility * noise.sample(&mut *rng);
        let std = std + reversion_rate * (base_std - std) + volatility * noise.sample(&mut *rng);

        (mean.max(1.0), std.max(1.0))
    }
}
