//! DeterministicRng - Seeded Random Number Generator
//!
//! TigerStyle: ChaCha20-based RNG so a seed replays the same hash keys,
//! vectors and fault decisions.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Seeded source of hash keys, vectors and fault rolls.
///
/// The same seed always produces the same sequence.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    rng: ChaCha20Rng,
}

impl DeterministicRng {
    /// Create a new RNG with the given seed.
    ///
    /// # Example
    /// ```
    /// use lshash_storage::dst::DeterministicRng;
    /// let mut rng = DeterministicRng::new(42);
    /// let key = rng.next_hash_key(8);
    /// assert_eq!(key.len(), 8);
    /// ```
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }

    /// A float in [0, 1).
    pub fn next_float(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// A random u64.
    pub fn next_u64(&mut self) -> u64 {
        self.rng.gen()
    }

    /// A usize in [min, max] (inclusive).
    ///
    /// # Panics
    /// Panics if min > max.
    pub fn next_usize(&mut self, min: usize, max: usize) -> usize {
        // Precondition
        assert!(min <= max, "min ({min}) must be <= max ({max})");

        self.rng.gen_range(min..=max)
    }

    /// `true` with the given probability.
    ///
    /// # Panics
    /// Panics if probability is not in [0, 1].
    pub fn next_bool(&mut self, probability: f64) -> bool {
        // Precondition
        assert!(
            (0.0..=1.0).contains(&probability),
            "probability must be in [0, 1], got {probability}"
        );

        self.next_float() < probability
    }

    /// A binary hash code of `width` characters (`'0'`/`'1'`).
    ///
    /// # Panics
    /// Panics if width is zero.
    pub fn next_hash_key(&mut self, width: usize) -> String {
        // Precondition
        assert!(width > 0, "hash key width must be positive");

        (0..width)
            .map(|_| if self.rng.gen::<bool>() { '1' } else { '0' })
            .collect()
    }

    /// A vector of `dims` components in [-1, 1).
    pub fn next_vector(&mut self, dims: usize) -> Vec<f64> {
        (0..dims).map(|_| self.next_float() * 2.0 - 1.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_sequence() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..20 {
            assert_eq!(rng1.next_hash_key(16), rng2.next_hash_key(16));
            assert_eq!(rng1.next_vector(3), rng2.next_vector(3));
        }
    }

    #[test]
    fn test_different_seeds_different_sequence() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(54321);

        let differs = (0..10).any(|_| rng1.next_u64() != rng2.next_u64());
        assert!(differs, "different seeds should produce different sequences");
    }

    #[test]
    fn test_next_bool_extremes() {
        let mut rng = DeterministicRng::new(42);

        for _ in 0..100 {
            assert!(!rng.next_bool(0.0));
            assert!(rng.next_bool(1.0));
        }
    }

    #[test]
    fn test_next_hash_key_is_binary() {
        let mut rng = DeterministicRng::new(42);

        for width in [1, 6, 32] {
            let key = rng.next_hash_key(width);
            assert_eq!(key.len(), width);
            assert!(key.chars().all(|c| c == '0' || c == '1'));
        }
    }

    #[test]
    fn test_next_vector_bounds() {
        let mut rng = DeterministicRng::new(7);
        let vector = rng.next_vector(64);

        assert_eq!(vector.len(), 64);
        assert!(vector.iter().all(|v| (-1.0..1.0).contains(v)));
    }

    #[test]
    fn test_next_usize_inclusive() {
        let mut rng = DeterministicRng::new(3);

        assert_eq!(rng.next_usize(5, 5), 5);
        assert!((0..200).all(|_| (1..=8).contains(&rng.next_usize(1, 8))));
    }

    #[test]
    #[should_panic(expected = "min (10) must be <= max (5)")]
    fn test_next_usize_invalid_range() {
        let mut rng = DeterministicRng::new(42);
        rng.next_usize(10, 5);
    }

    #[test]
    #[should_panic(expected = "hash key width must be positive")]
    fn test_next_hash_key_zero_width() {
        let mut rng = DeterministicRng::new(42);
        rng.next_hash_key(0);
    }
}
