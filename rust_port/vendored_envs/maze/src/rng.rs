use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Source of uniform draws used by maze generation and placement.
///
/// Every `RngCore` is a `RandomSource`, so callers can hand in any seeded
/// generator; environments own theirs and only reseed on an explicit request.
pub trait RandomSource {
    /// Uniform integer in `0..upper`. Returns 0 when `upper` is 0.
    fn below(&mut self, upper: usize) -> usize;

    /// Uniform choice over `items`, `None` when empty.
    fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            return None;
        }
        let i = self.below(items.len());
        items.get(i)
    }
}

impl<R: RngCore> RandomSource for R {
    fn below(&mut self, upper: usize) -> usize {
        if upper == 0 { 0 } else { self.gen_range(0..upper) }
    }
}

/// Generator owned by each environment instance.
pub type MazeRng = ChaCha8Rng;

/// Deterministic generator for a given seed.
pub fn seeded(seed: u64) -> MazeRng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Generator seeded from OS entropy, used when no seed is configured.
pub fn from_entropy() -> MazeRng {
    ChaCha8Rng::from_entropy()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_draws() {
        let mut a = seeded(7);
        let mut b = seeded(7);
        let da: Vec<usize> = (0..32).map(|_| a.below(100)).collect();
        let db: Vec<usize> = (0..32).map(|_| b.below(100)).collect();
        assert_eq!(da, db);
        assert!(da.iter().all(|&v| v < 100));
    }

    #[test]
    fn below_zero_is_zero() {
        let mut r = seeded(1);
        assert_eq!(r.below(0), 0);
    }

    #[test]
    fn choose_handles_empty_and_singleton() {
        let mut r = seeded(3);
        let empty: [u8; 0] = [];
        assert!(r.choose(&empty).is_none());
        assert_eq!(r.choose(&[42]), Some(&42));
    }
}
