//! DST - Deterministic Simulation Testing
//!
//! Seeded randomness and fault injection for exercising storage backends.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use lshash_storage::dst::{DeterministicRng, FaultConfig, FaultInjectorBuilder, FaultType};
//! use lshash_storage::storage::InMemoryBackend;
//!
//! let faults = FaultInjectorBuilder::new(DeterministicRng::new(42))
//!     .with_fault(FaultConfig::new(FaultType::StorageWriteFail, 0.1))
//!     .build();
//! let backend = InMemoryBackend::with_fault_injector(0, Arc::new(faults));
//! ```
//!
//! Run with explicit seed for reproducibility:
//! ```bash
//! DST_SEED=12345 cargo test
//! ```

mod config;
mod fault;
mod rng;

pub use config::{SimConfig, DST_SEED_ENV};
pub use fault::{FaultConfig, FaultInjector, FaultInjectorBuilder, FaultType};
pub use rng::DeterministicRng;
