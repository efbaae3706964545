use std::f64::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

pub type StreamRng = ChaCha20Rng;

/// Lower clamp for the radial uniform so `ln(u1)` stays finite.
pub const UNIFORM_FLOOR: f64 = 1e-10;
pub const UNIFORM_CEILING: f64 = 1.0 - 1e-10;

/// Standard normal from two uniforms (Box-Muller, cosine branch).
///
/// `u1` is clamped into `[UNIFORM_FLOOR, UNIFORM_CEILING]`; the result is finite for
/// any finite `u2`.
pub fn box_muller(u1: f64, u2: f64) -> f64 {
    let u1 = if u1.is_nan() {
        UNIFORM_FLOOR
    } else {
        u1.clamp(UNIFORM_FLOOR, UNIFORM_CEILING)
    };
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

pub fn standard_normal(rng: &mut StreamRng) -> f64 {
    let u1: f64 = rng.random();
    let u2: f64 = rng.random();
    box_muller(u1, u2)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyDrift {
    pub mean: f64,
    pub volatility: f64,
}

impl MonthlyDrift {
    /// `mean = ln(1 + max(r, -0.99)) / 12`, `vol = max(v, 0) / sqrt(12)`.
    pub fn from_annual(mean_return: f64, volatility: f64) -> Self {
        let mean = (1.0 + (mean_return / 100.0).max(-0.99)).ln() / 12.0;
        let volatility = (volatility / 100.0).max(0.0) / 12.0_f64.sqrt();
        Self { mean, volatility }
    }

    pub fn sample_factor(&self, rng: &mut StreamRng) -> f64 {
        let z = standard_normal(rng);
        (self.mean + z * self.volatility).exp()
    }
}

/// Seed for one worker chunk: `base` mixed with the chunk index.
pub fn derive_chunk_seed(base: u64, chunk_index: usize) -> u64 {
    splitmix64(base ^ ((chunk_index as u64) << 32) ^ chunk_index as u64)
}

/// Base seed from the wall clock at nanosecond resolution.
///
/// This only decorrelates chunks and runs; it is not a security control.
pub fn clock_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    splitmix64(nanos as u64 ^ (nanos >> 64) as u64)
}

pub fn stream_for_seed(seed: u64) -> StreamRng {
    StreamRng::seed_from_u64(seed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
