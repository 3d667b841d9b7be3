use std::fmt;

use serde::{Deserialize, Serialize};

/// Seed of the level-wide random stream.
pub const GLOBAL_SEED: i32 = 0x8474_4901_u32 as i32;

/// Source of deterministic pseudo-random integers.
pub trait RandomSource: fmt::Debug {
    /// Returns a value in `0..range`, or zero when `range` is not positive.
    fn next(&mut self, range: i32) -> i32;
}

/// Linear congruential generator shared by the world and every object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Random {
    seed: i32,
}

impl Random {
    /// Creates a generator from a seed.
    #[must_use]
    pub const fn new(seed: i32) -> Self {
        Self { seed }
    }

    /// Current internal state.
    #[must_use]
    pub const fn seed(&self) -> i32 {
        self.seed
    }
}

impl RandomSource for Random {
    fn next(&mut self, range: i32) -> i32 {
        self.seed = self
            .seed
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        if range <= 0 {
            return 0;
        }
        ((i64::from(self.seed & 0x7fff) * i64::from(range)) >> 15) as i32
    }
}
