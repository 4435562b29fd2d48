//! Single seeded RNG shared by every random draw in the engine.
//!
//! Determinism (spec §9, P6) requires that two sessions started from the
//! same seed and fed the same input produce byte-identical prose and combat
//! outcomes. The only way to guarantee that is to route *every* draw —
//! flavor text variants, combat hit rolls, NPC dialogue picks, reservoir
//! ejections — through one `Rng` instance, and to make that instance's
//! state serializable so save/restore can resume the exact draw sequence.

use rand::{RngCore, SeedableRng};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Deterministic, save/restorable RNG. Wraps a PCG generator behind a count
/// of draws made so far; restoring a save re-seeds and fast-forwards rather
/// than serializing the generator's internal state directly, since `Pcg64Mcg`
/// does not implement `Serialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rng {
    seed: u64,
    draws: u64,
    #[serde(skip, default = "zero_inner")]
    inner: Option<StdRng>,
}

fn zero_inner() -> Option<StdRng> {
    None
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            seed,
            draws: 0,
            inner: None,
        };
        rng.ensure_inner();
        rng
    }

    /// Rebuild a restored RNG: reseed and replay exactly `draws` draws so the
    /// next call continues precisely where the saved session left off.
    pub fn resume(seed: u64, draws: u64) -> Self {
        let mut rng = Self::new(seed);
        for _ in 0..draws {
            rng.raw_u32();
        }
        rng
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    fn ensure_inner(&mut self) -> &mut StdRng {
        if self.inner.is_none() {
            self.inner = Some(StdRng::seed_from_u64(self.seed));
        }
        self.inner.as_mut().unwrap()
    }

    fn raw_u32(&mut self) -> u32 {
        self.draws += 1;
        self.ensure_inner().next_u32()
    }

    /// Inclusive-exclusive integer range, e.g. `next_in_range(1, 7)` for a d6.
    pub fn next_in_range(&mut self, low: i64, high_exclusive: i64) -> i64 {
        debug_assert!(high_exclusive > low);
        let span = (high_exclusive - low) as u64;
        low + (self.raw_u32() as u64 % span) as i64
    }

    /// True with probability `percent / 100.0`.
    pub fn chance_percent(&mut self, percent: f64) -> bool {
        let roll = self.raw_u32() as f64 / u32::MAX as f64 * 100.0;
        roll < percent
    }

    /// Pick a uniformly random element; returns `None` for an empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.next_in_range(0, items.len() as i64) as usize;
        items.get(idx)
    }

    /// Weighted pick over `(weight, item)` pairs: weights are summed and a
    /// single draw selects a slot, without an independently-seeded
    /// generator.
    pub fn choose_weighted<'a, T>(&mut self, items: &'a [(usize, T)]) -> Option<&'a T> {
        let total: usize = items.iter().map(|(w, _)| *w).sum();
        if total == 0 {
            return None;
        }
        let mut roll = self.next_in_range(0, total as i64) as usize;
        for (weight, item) in items {
            if roll < *weight {
                return Some(item);
            }
            roll -= weight;
        }
        items.last().map(|(_, item)| item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        let seq_a: Vec<i64> = (0..20).map(|_| a.next_in_range(0, 1000)).collect();
        let seq_b: Vec<i64> = (0..20).map(|_| b.next_in_range(0, 1000)).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn resume_replays_exact_sequence() {
        let mut original = Rng::new(7);
        for _ in 0..5 {
            original.next_in_range(0, 100);
        }
        let draws_so_far = original.draws();
        let next_from_original = original.next_in_range(0, 100);

        let mut resumed = Rng::resume(7, draws_so_far);
        let next_from_resumed = resumed.next_in_range(0, 100);
        assert_eq!(next_from_original, next_from_resumed);
    }

    #[test]
    fn choose_weighted_respects_zero_weight() {
        let mut rng = Rng::new(1);
        let items = vec![(0usize, "never"), (1, "always")];
        for _ in 0..50 {
            assert_eq!(rng.choose_weighted(&items), Some(&"always"));
        }
    }

    #[test]
    fn range_stays_in_bounds() {
        let mut rng = Rng::new(99);
        for _ in 0..500 {
            let v = rng.next_in_range(3, 9);
            assert!((3..9).contains(&v));
        }
    }
}
