//! Storage Backend Trait
//!
//! TigerStyle: One contract for every hash table store.
//!
//! The in-memory adapter is the reference: every adapter must agree with it
//! on ordering, absent-key behaviour and error kinds.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;

use super::error::StorageResult;
use super::types::{BackendKind, Entry, HashKey};

/// Table-scoped storage for one LSH hash table.
///
/// TigerStyle: All operations are async and return explicit errors. No
/// operation retries on failure.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Which adapter this is.
    fn kind(&self) -> BackendKind;

    /// Hash table this backend stores.
    fn table_index(&self) -> u32;

    /// All keys currently stored for this table.
    async fn keys(&self) -> StorageResult<BTreeSet<HashKey>>;

    /// Overwrite the scalar value stored at `key`.
    async fn set_val(&self, key: &HashKey, value: &Value) -> StorageResult<()>;

    /// Read the scalar value stored at `key`.
    ///
    /// Returns `KeyNotFound` if nothing is stored there.
    async fn get_val(&self, key: &HashKey) -> StorageResult<Value>;

    /// Append `entry` to the bucket at `key`, creating the bucket if absent.
    ///
    /// Appends to one key are never lost, even from concurrent callers.
    async fn append_val(&self, key: &HashKey, entry: &Entry) -> StorageResult<()>;

    /// The bucket at `key` in append order.
    ///
    /// Returns an empty list if the key is absent; absence is never an error.
    async fn get_list(&self, key: &HashKey) -> StorageResult<Vec<Entry>>;

    /// Remove every bucket of this table.
    async fn clean(&self) -> StorageResult<()>;

    /// Release the connection held by this backend.
    ///
    /// Calls after `close` fail with `BackendUnavailable` on remote stores.
    async fn close(&self) -> StorageResult<()> {
        Ok(())
    }
}
