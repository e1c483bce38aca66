//! Seeded linear congruential generator
//!
//! Every random draw in a session flows through one `Lcg32` seeded with the
//! session seed. The recurrence is fixed (a=1664525, c=1013904223, m=2^32) so
//! a seed reproduces the same stream on every platform.

use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

const LCG_A: u32 = 1_664_525;
const LCG_C: u32 = 1_013_904_223;
const TWO_POW_32: f64 = 4_294_967_296.0;

/// Deterministic 32-bit LCG
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lcg32 {
    seed: u32,
    state: u32,
}

impl Lcg32 {
    pub fn new(seed: u32) -> Self {
        Self { seed, state: seed }
    }

    /// The seed this generator was created with (not the current state)
    pub fn seed(&self) -> u32 {
        self.seed
    }

    #[inline]
    fn step(&mut self) -> u32 {
        self.state = LCG_A.wrapping_mul(self.state).wrapping_add(LCG_C);
        self.state
    }

    /// Advance and return a float in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.step() as f64 / TWO_POW_32
    }

    /// Advance and return an integer in [min, max], both inclusive.
    ///
    /// `min` must not exceed `max`. Any range of `i64` is accepted; the span
    /// is computed in `i128` so `i64::MIN..=i64::MAX` cannot overflow.
    pub fn next_int(&mut self, min: i64, max: i64) -> i64 {
        debug_assert!(min <= max, "next_int range is empty: {}..={}", min, max);
        let (min, max) = (min as i128, max as i128);
        let span = (max - min + 1) as f64;
        // Rounding in very wide spans can land one past max
        ((self.next_f64() * span).floor() as i128 + min).min(max) as i64
    }
}

impl RngCore for Lcg32 {
    fn next_u32(&mut self) -> u32 {
        self.step()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.step() as u64;
        let hi = self.step() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(4) {
            let bytes = self.step().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

impl SeedableRng for Lcg32 {
    type Seed = [u8; 4];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_draws_match_recurrence() {
        let mut rng = Lcg32::new(0);
        // state_1 = 1013904223
        assert_eq!(rng.next_f64(), 1_013_904_223.0 / TWO_POW_32);
        // state_2 = 1664525 * 1013904223 + 1013904223 mod 2^32
        let expected = 1_664_525u64 * 1_013_904_223 + 1_013_904_223;
        assert_eq!(rng.next_u32(), (expected % (1 << 32)) as u32);
    }

    #[test]
    fn test_seed_is_initial_not_state() {
        let mut rng = Lcg32::new(42);
        rng.next_f64();
        rng.next_int(0, 10);
        assert_eq!(rng.seed(), 42);
    }

    #[test]
    fn test_next_f64_unit_interval() {
        let mut rng = Lcg32::new(u32::MAX);
        for _ in 0..10_000 {
            let x = rng.next_f64();
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_single_value_range() {
        let mut rng = Lcg32::new(7);
        for _ in 0..100 {
            assert_eq!(rng.next_int(5, 5), 5);
        }
    }

    #[test]
    fn test_full_i64_range_stays_in_bounds() {
        let mut rng = Lcg32::new(99);
        let negative = (0..1000)
            .filter(|_| rng.next_int(i64::MIN, i64::MAX) < 0)
            .count();
        assert!(negative > 0 && negative < 1000);
        let mut rng = Lcg32::new(7);
        for _ in 0..1000 {
            let v = rng.next_int(i64::MAX - 2, i64::MAX);
            assert!(v >= i64::MAX - 2);
        }

        // Narrow ranges draw the same values as plain arithmetic
        let mut a = Lcg32::new(2024);
        let mut b = Lcg32::new(2024);
        for _ in 0..100 {
            let expected = (b.next_f64() * 33.0).floor() as i64 + 24;
            assert_eq!(a.next_int(24, 56), expected);
        }
    }

    #[test]
    fn test_from_seed_matches_new() {
        let mut a = Lcg32::from_seed(1234u32.to_le_bytes());
        let mut b = Lcg32::new(1234);
        for _ in 0..32 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_fill_bytes_partial_chunk() {
        let mut a = Lcg32::new(9);
        let mut b = Lcg32::new(9);
        let mut buf = [0u8; 6];
        a.fill_bytes(&mut buf);
        let first = b.next_u32().to_le_bytes();
        let second = b.next_u32().to_le_bytes();
        assert_eq!(&buf[..4], &first);
        assert_eq!(&buf[4..], &second[..2]);
    }

    proptest! {
        #[test]
        fn prop_same_seed_same_sequence(seed in any::<u32>(), ops in prop::collection::vec(any::<bool>(), 1..200)) {
            let mut a = Lcg32::new(seed);
            let mut b = Lcg32::new(seed);
            for use_int in ops {
                if use_int {
                    prop_assert_eq!(a.next_int(-50, 50), b.next_int(-50, 50));
                } else {
                    prop_assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
                }
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_next_int_in_bounds(seed in any::<u32>(), min in -1000i64..1000, width in 0i64..1000) {
            let max = min + width;
            let mut rng = Lcg32::new(seed);
            for _ in 0..100_000 {
                let v = rng.next_int(min, max);
                prop_assert!(v >= min && v <= max);
            }
        }
    }
}
