//! # LSHash Storage
//!
//! Hash table storage for locality-sensitive hashing indexes, with
//! deterministic simulation testing.
//!
//! An LSH index hashes every input vector once per hash table and files the
//! vector under the resulting binary hash code. This crate stores those
//! buckets: one [`StorageBackend`] per hash table, selected by
//! [`StorageConfig`].
//!
//! ## Features
//!
//! - **Three stores**: process-local map, Redis, MongoDB
//! - **No lost appends**: every backend appends atomically at the store
//! - **One codec**: entries are written and read as `[vector, extra_data]`
//! - **Deterministic Testing**: seeded fault injection on the in-memory store
//!
//! ## Quick Start
//!
//! ```rust
//! use lshash_storage::{create_backend, Entry, HashKey, StorageConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = create_backend(&StorageConfig::InMemory, 0).await?;
//! let key = HashKey::new("aabbcc")?;
//!
//! table.append_val(&key, &Entry::new(vec![1.0, 2.0, 3.0], "app1")).await?;
//! table.append_val(&key, &Entry::new(vec![4.0, 5.0, 6.0], "app2")).await?;
//!
//! let bucket = table.get_list(&key).await?;
//! assert_eq!(bucket[0].extra_data, "app1");
//! assert_eq!(bucket[1].vector, vec![4.0, 5.0, 6.0]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │            HashTables (one backend per table)           │
//! ├─────────────────────────────────────────────────────────┤
//! │  StorageBackend: keys / set_val / get_val /             │
//! │                  append_val / get_list / clean          │
//! ├─────────────────────────────────────────────────────────┤
//! │  InMemory         │ RwLock<HashMap>, fault injection    │
//! │  CacheStore       │ Redis db per table, RPUSH / LRANGE  │
//! │  DocumentStore    │ Mongo collection per table, $push   │
//! ├─────────────────────────────────────────────────────────┤
//! │  DST Framework    │ Seeded RNG + fault injection        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - `cache-store` - Redis backend (default)
//! - `document-store` - MongoDB backend (default)
//!
//! Selecting a backend whose feature is disabled fails with
//! [`StorageError::DependencyUnavailable`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod dst;
pub mod storage;

// Re-export common types
pub use constants::*;
pub use dst::{
    DeterministicRng, FaultConfig, FaultInjector, FaultInjectorBuilder, FaultType, SimConfig,
};
pub use storage::{
    create_backend, BackendKind, CacheStoreConfig, DocumentStoreConfig, Entry, ExtraData,
    HashKey, HashTables, InMemoryBackend, StorageBackend, StorageConfig, StorageError,
    StorageResult,
};

#[cfg(feature = "cache-store")]
pub use storage::CacheStoreBackend;

#[cfg(feature = "document-store")]
pub use storage::DocumentStoreBackend;
