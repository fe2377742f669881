//! Per-thread source of random samples.

use std::f64::consts::PI;

use lumo_math::{DVec3, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random number state threaded through shading calls.
///
/// Every worker owns its own context; seeds are derived from the render
/// seed and the worker or generator index so renders are reproducible for
/// a fixed thread count.
pub struct SamplingContext {
    rng: StdRng,
}

impl SamplingContext {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Context for stream `index` of a render seeded with `seed`.
    pub fn for_stream(seed: u64, index: usize) -> Self {
        // SplitMix64 step so neighboring streams do not correlate
        let mut z = seed ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        Self::new(z ^ (z >> 31))
    }

    /// Uniform sample in [0, 1).
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Uniform sample in [0, 1).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen()
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn next_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Sub-pixel offset in [-0.5, 0.5)².
    pub fn next_pixel_jitter(&mut self) -> Vec2 {
        Vec2::new(self.next_f32() - 0.5, self.next_f32() - 0.5)
    }

    /// Uniformly distributed unit direction.
    pub fn next_direction(&mut self) -> DVec3 {
        let z = 1.0 - 2.0 * self.next_f64();
        let r = (1.0 - z * z).max(0.0).sqrt();
        let phi = 2.0 * PI * self.next_f64();
        DVec3::new(r * phi.cos(), r * phi.sin(), z)
    }
}
