//! Injected randomness
//!
//! Every random decision in the simulation goes through `RandomSource`, so
//! a seeded `GameRng` makes a run reproducible and tests can script the
//! random branches directly.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Source of randomness for generation and scoring
pub trait RandomSource {
    /// Uniform float in [0, 1)
    fn unit(&mut self) -> f32;

    /// Uniform index in [0, n). `n` must be non-zero.
    fn below(&mut self, n: usize) -> usize;

    /// Uniform integer in [lo, hi] (inclusive)
    fn between(&mut self, lo: i32, hi: i32) -> i32;

    /// True with probability `p`
    fn chance(&mut self, p: f32) -> bool {
        self.unit() < p
    }

    /// Uniform float in [-max, max]
    fn spread(&mut self, max: f32) -> f32 {
        if max <= 0.0 {
            return 0.0;
        }
        (self.unit() * 2.0 - 1.0) * max
    }
}

/// Seeded PCG generator
#[derive(Debug, Clone)]
pub struct GameRng {
    seed: u64,
    inner: Pcg32,
}

impl GameRng {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: Pcg32::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Draw a fresh seed for the next game
    pub fn next_seed(&mut self) -> u64 {
        self.inner.random()
    }
}

impl RandomSource for GameRng {
    fn unit(&mut self) -> f32 {
        self.inner.random::<f32>()
    }

    fn below(&mut self, n: usize) -> usize {
        self.inner.random_range(0..n)
    }

    fn between(&mut self, lo: i32, hi: i32) -> i32 {
        self.inner.random_range(lo..=hi)
    }
}
