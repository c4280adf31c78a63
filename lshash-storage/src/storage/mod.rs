//! Storage - Backend Trait and Implementations
//!
//! TigerStyle: One contract, three stores, simulation-first testing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │          HashTables / create_backend(config, index)          │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StorageBackend Trait                      │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                    ↑                    ↑
//!          │                    │                    │
//! ┌────────┴────────┐  ┌────────┴────────┐  ┌───────┴────────┐
//! │ InMemoryBackend │  │CacheStoreBackend│  │DocumentStore   │
//! │ (process-local) │  │    (Redis)      │  │Backend (Mongo) │
//! └─────────────────┘  └─────────────────┘  └────────────────┘
//! ```
//!
//! # Simulation-First
//!
//! `InMemoryBackend` is the reference adapter. Built with a
//! [`FaultInjector`](crate::dst::FaultInjector) it fails operations
//! deterministically, so callers can be tested against store failures
//! without a server.

mod backend;
mod codec;
mod config;
mod error;
mod factory;
mod memory;
mod types;

#[cfg(feature = "cache-store")]
mod cache;

#[cfg(feature = "document-store")]
mod document;

pub use backend::StorageBackend;
pub use codec::{decode_bucket, decode_entry, decode_value, encode_entry, encode_value};
pub use config::{CacheStoreConfig, DocumentStoreConfig, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use factory::{create_backend, HashTables};
pub use memory::InMemoryBackend;
pub use types::{BackendKind, Entry, ExtraData, HashKey};

#[cfg(feature = "cache-store")]
pub use cache::CacheStoreBackend;

#[cfg(feature = "document-store")]
pub use document::{entry_from_bson, entry_to_bson, DocumentStoreBackend};
