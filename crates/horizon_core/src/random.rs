//! Seeded randomness for path simulation
//!
//! Every path owns its own [`RandomContext`]. With a base seed, path `i` is
//! seeded with `offset_seed(base, i)`, so a path's draws never depend on how
//! the run was split into batches or workers.

use std::f64::consts::PI;

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

const TWO_POW_32: f64 = 4_294_967_296.0;

/// 32-bit state generator (mulberry32)
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    #[must_use]
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Uniform in `[0, 1)` with 32 bits of resolution.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_u32()) / TWO_POW_32
    }
}

impl RngCore for Mulberry32 {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let s = self.state;
        let mut t = (s ^ (s >> 15)).wrapping_mul(1 | s);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t));
        t ^ (t >> 14)
    }

    fn next_u64(&mut self) -> u64 {
        let lo = u64::from(self.next_u32());
        let hi = u64::from(self.next_u32());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

impl SeedableRng for Mulberry32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::new(state as u32)
    }
}

#[derive(Debug, Clone)]
enum Source {
    Seeded(Mulberry32),
    Entropy(SmallRng),
}

/// Uniform and standard-normal draws for one path.
///
/// Seeded contexts generate normals with Box-Muller, caching the sine half of
/// each pair for the next call, so a seed fixes the whole draw sequence.
/// Unseeded contexts sample `StandardNormal` directly.
#[derive(Debug, Clone)]
pub struct RandomContext {
    source: Source,
    spare: Option<f64>,
}

impl RandomContext {
    /// Seeded context, or an OS-seeded one when `seed` is `None`.
    #[must_use]
    pub fn new(seed: Option<u32>) -> Self {
        let source = match seed {
            Some(seed) => Source::Seeded(Mulberry32::new(seed)),
            None => Source::Entropy(SmallRng::from_os_rng()),
        };
        Self {
            source,
            spare: None,
        }
    }

    #[must_use]
    pub fn seeded(seed: u32) -> Self {
        Self::new(Some(seed))
    }

    /// Uniform in `[0, 1)`.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        match &mut self.source {
            Source::Seeded(rng) => rng.next_f64(),
            Source::Entropy(rng) => rng.random::<f64>(),
        }
    }

    /// Standard normal draw.
    pub fn randn(&mut self) -> f64 {
        if let Source::Entropy(rng) = &mut self.source {
            return StandardNormal.sample(rng);
        }
        if let Some(spare) = self.spare.take() {
            return spare;
        }
        let mut u = 0.0;
        while u == 0.0 {
            u = self.uniform();
        }
        let mut v = 0.0;
        while v == 0.0 {
            v = self.uniform();
        }
        let mag = (-2.0 * u.ln()).sqrt();
        self.spare = Some(mag * (2.0 * PI * v).sin());
        mag * (2.0 * PI * v).cos()
    }

    /// Uniform integer in `[0, n)`. `n` must be positive.
    #[inline]
    pub fn index(&mut self, n: usize) -> usize {
        debug_assert!(n > 0);
        ((self.uniform() * n as f64) as usize).min(n.saturating_sub(1))
    }
}

/// Per-path seed: wrapping `base + offset`, or `None` when unseeded.
#[must_use]
pub fn offset_seed(base: Option<u32>, offset: u32) -> Option<u32> {
    base.map(|b| b.wrapping_add(offset))
}
