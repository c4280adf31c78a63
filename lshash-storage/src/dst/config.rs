//! SimConfig - Simulation Seed
//!
//! TigerStyle: A failing run is replayed by pinning its seed.

use std::env;

use rand::Rng;

/// Environment variable that pins the simulation seed.
pub const DST_SEED_ENV: &str = "DST_SEED";

/// Seed for one simulation run.
///
/// A generated seed is logged so the run can be replayed with
/// `DST_SEED=<seed>`.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    seed: u64,
}

impl SimConfig {
    /// Create config with explicit seed.
    ///
    /// # Example
    /// ```
    /// use lshash_storage::dst::SimConfig;
    /// let config = SimConfig::with_seed(12345);
    /// assert_eq!(config.seed(), 12345);
    /// ```
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }

    /// Seed from `DST_SEED`, or a fresh random one.
    ///
    /// # Panics
    /// Panics if `DST_SEED` is set but is not a valid u64.
    #[must_use]
    pub fn from_env_or_random() -> Self {
        let seed = match env::var(DST_SEED_ENV) {
            Ok(seed_str) => seed_str
                .parse::<u64>()
                .unwrap_or_else(|_| panic!("{DST_SEED_ENV} must be a valid u64, got: {seed_str}")),
            Err(_) => {
                let seed = rand::thread_rng().gen::<u64>();
                tracing::info!(seed, "DST: generated random seed (replay with DST_SEED)");
                seed
            }
        };

        Self::with_seed(seed)
    }

    /// The seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::from_env_or_random()
    }
}
