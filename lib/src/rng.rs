//! The engine's sole source of randomness.
//!
//! A linear-congruential generator with 32-bit state. The determinism
//! contract requires every randomness draw inside a tick to go through
//! this type, in a fixed order, including on losing/aborting code paths.

use rand::{RngCore, SeedableRng};

const MASK_30: i64 = (1i64 << 30) - 1;

/// Seedable pseudo-random integer source.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Lcg {
    state: i64,
}

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self {
            state: (seed as i64) & MASK_30,
        }
    }

    fn step(&mut self) {
        self.state = ((self.state + 12355) * 16807).abs() & MASK_30;
    }

    /// Draws a value in `[0, limit)`. `limit <= 0` always yields `0`.
    pub fn next_bounded(&mut self, limit: i64) -> i64 {
        if limit <= 0 {
            return 0;
        }
        self.step();
        (self.state >> 8) % limit
    }
}

impl SeedableRng for Lcg {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Lcg::new(u64::from_le_bytes(seed))
    }
}

impl RngCore for Lcg {
    fn next_u32(&mut self) -> u32 {
        self.step();
        self.state as u32
    }

    fn next_u64(&mut self) -> u64 {
        ((self.next_u32() as u64) << 32) | self.next_u32() as u64
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand_core_fill(self, dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

fn rand_core_fill(rng: &mut Lcg, dest: &mut [u8]) {
    let mut chunks = dest.chunks_exact_mut(4);
    for chunk in &mut chunks {
        chunk.copy_from_slice(&rng.next_u32().to_le_bytes());
    }
    let rem = chunks.into_remainder();
    if !rem.is_empty() {
        let bytes = rng.next_u32().to_le_bytes();
        rem.copy_from_slice(&bytes[..rem.len()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_seed() {
        let mut a = Lcg::new(42);
        let mut b = Lcg::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_bounded(1000), b.next_bounded(1000));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Lcg::new(1);
        let mut b = Lcg::new(2);
        let seq_a: Vec<_> = (0..32).map(|_| a.next_bounded(1 << 20)).collect();
        let seq_b: Vec<_> = (0..32).map(|_| b.next_bounded(1 << 20)).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn bounded_output_in_range() {
        let mut r = Lcg::new(7);
        for _ in 0..10_000 {
            let v = r.next_bounded(37);
            assert!(v >= 0 && v < 37);
        }
    }

    #[test]
    fn zero_limit_is_zero() {
        let mut r = Lcg::new(7);
        assert_eq!(r.next_bounded(0), 0);
    }
}
