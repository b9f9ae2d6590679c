// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// Hand-rolled with zero external dependencies so that a seed produces the
// same word list on every platform and toolchain.
//
// This crate is the single source of randomness for `glossa_lang`: shape
// selection, optional-segment coin flips, and phoneme filling all draw from
// one `WordRng` owned by the engine instance. Two engines built with the same
// seed and the same configuration produce identical vocabularies.
//
// **Critical constraint: determinism.** Every method on `WordRng` must produce
// identical output given the same prior state, regardless of platform, compiler
// version, or optimization level. Do not use floating-point arithmetic in the
// core generator, stdlib PRNG, or any source of non-determinism in this module.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG.
///
/// Each engine owns its own `WordRng`, seeded once at construction. Engines
/// for different languages never share a stream.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WordRng {
    s: [u64; 4],
}

impl WordRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two `WordRng` instances created with the same seed will produce
    /// identical output sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a uniform `f64` in [0, 1).
    ///
    /// Uses the upper 53 bits of a `u64` to fill the mantissa of an f64.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Return `true` with probability `p`, `false` otherwise.
    ///
    /// `p <= 0.0` always returns false, `p >= 1.0` always returns true.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Negative, zero, and non-finite weights never win. Returns `None` (and
    /// consumes no randomness) when no weight is positive, leaving the caller
    /// to decide on a fallback.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let usable = |w: f64| w.is_finite() && w > 0.0;
        let total: f64 = weights.iter().copied().filter(|&w| usable(w)).sum();
        if total <= 0.0 || !total.is_finite() {
            return None;
        }

        let target = self.next_f64() * total;
        let mut cumulative = 0.0;
        let mut last_usable = None;
        for (i, &w) in weights.iter().enumerate() {
            if !usable(w) {
                continue;
            }
            cumulative += w;
            last_usable = Some(i);
            if target < cumulative {
                return Some(i);
            }
        }
        // Rounding can leave `target` a hair above the final cumulative sum.
        last_usable
    }
}

/// SplitMix64, used only for seeding xoshiro256++ from a single `u64`.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
