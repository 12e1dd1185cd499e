//! # Stochastic Module
//!
//! Seeded random source for placement and shake proposals.
//!
//! The generator is ChaCha8, whose output stream is fixed for a given seed
//! on every platform, so a seed plus a configuration fully determines the
//! packing. Draws are consumed strictly sequentially by the packer.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::types::Vec3;

/// Reproducible pseudo-random number generator
#[derive(Clone, Debug)]
pub struct RandomGenerator {
    rng: ChaCha8Rng,
    seed: u64,
}

impl RandomGenerator {
    /// Create new RNG with seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed this generator was created from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Generate uniform [0, 1)
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Generate uniform in range [a, b)
    #[inline]
    pub fn uniform_range(&mut self, a: f64, b: f64) -> f64 {
        a + (b - a) * self.uniform()
    }

    /// Generate uniform in [-1, 1)
    #[inline]
    pub fn symmetric(&mut self) -> f64 {
        2.0 * self.uniform() - 1.0
    }

    /// Random displacement with each component in [-scale, scale)
    pub fn displacement(&mut self, scale: f64) -> Vec3 {
        let x = self.symmetric();
        let y = self.symmetric();
        let z = self.symmetric();
        Vec3::new(x, y, z) * scale
    }
}

impl Default for RandomGenerator {
    fn default() -> Self {
        Self::new(42) // Reproducible default
    }
}

/// Seed derived from the wall clock
pub fn time_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
