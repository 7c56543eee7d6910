//! Deterministic random number generation.
//!
//! RULE: Nothing in the generator may call any platform RNG.
//! All randomness flows through SimRng instances derived
//! from the single master seed in SimConfig.
//!
//! Each merchant gets its own RNG stream, seeded deterministically
//! from (master_seed XOR merchant_index * golden). This means:
//!   - A merchant's rows never depend on how many merchants precede it.
//!   - Each merchant's stream is fully reproducible in isolation.
//!   - Merchants could be generated in parallel without changing output.

use rand::{RngCore, SeedableRng};
use rand_distr::Distribution;
use rand_pcg::Pcg64Mcg;

const STREAM_MIX: u64 = 0x9e37_79b9_7f4a_7c15;

/// A deterministic RNG for a single merchant's lifecycle.
pub struct SimRng {
    inner: Pcg64Mcg,
}

impl SimRng {
    /// Create an RNG from the master seed and a stable stream index.
    pub fn new(master_seed: u64, stream: u64) -> Self {
        let derived_seed = master_seed ^ stream.wrapping_mul(STREAM_MIX);
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an integer in [lo, hi], both ends included.
    pub fn range_inclusive(&mut self, lo: u32, hi: u32) -> u32 {
        assert!(lo <= hi, "empty range {lo}..={hi}");
        lo + self.next_u64_below(u64::from(hi - lo) + 1) as u32
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Uniform pick from a non-empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        assert!(!items.is_empty(), "pick() from empty slice");
        &items[self.next_u64_below(items.len() as u64) as usize]
    }

    /// Weighted pick. Weights need not sum to 1; the last item absorbs
    /// any rounding left over by the cumulative walk.
    pub fn pick_weighted<'a, T>(&mut self, items: &'a [(T, f64)]) -> &'a T {
        assert!(!items.is_empty(), "pick_weighted() from empty slice");
        let total: f64 = items.iter().map(|(_, w)| w).sum();
        let roll = self.next_f64() * total;
        let mut cumulative = 0.0;
        for (item, weight) in items {
            cumulative += weight;
            if roll < cumulative {
                return item;
            }
        }
        &items[items.len() - 1].0
    }

    /// Draw one value from a `rand_distr` distribution on this stream.
    pub fn sample<D: Distribution<f64>>(&mut self, dist: &D) -> f64 {
        dist.sample(&mut self.inner)
    }
}

/// Hands out per-merchant streams for a single run.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_merchant(&self, merchant_id: u32) -> SimRng {
        SimRng::new(self.master_seed, u64::from(merchant_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_stream_is_reproducible() {
        let bank = RngBank::new(42);
        let mut a = bank.for_merchant(7);
        let mut b = bank.for_merchant(7);
        for _ in 0..100 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn merchant_streams_differ() {
        let bank = RngBank::new(42);
        let mut first = bank.for_merchant(1);
        let mut second = bank.for_merchant(2);
        let a: Vec<u64> = (0..8).map(|_| first.next_u64_below(1 << 40)).collect();
        let b: Vec<u64> = (0..8).map(|_| second.next_u64_below(1 << 40)).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn range_inclusive_hits_both_ends() {
        let mut rng = SimRng::new(1, 0);
        let draws: Vec<u32> = (0..2_000).map(|_| rng.range_inclusive(60, 90)).collect();
        assert!(draws.iter().all(|d| (60..=90).contains(d)));
        assert!(draws.contains(&60), "lower bound never drawn");
        assert!(draws.contains(&90), "upper bound never drawn");
    }

    #[test]
    fn pick_weighted_follows_weights() {
        let mut rng = SimRng::new(9, 3);
        let items = [("heavy", 0.9), ("light", 0.1)];
        let heavy = (0..10_000)
            .filter(|_| *rng.pick_weighted(&items) == "heavy")
            .count();
        let share = heavy as f64 / 10_000.0;
        assert!((share - 0.9).abs() < 0.02, "heavy share {share:.3}");
    }
}
