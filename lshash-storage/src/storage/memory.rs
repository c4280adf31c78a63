//! `InMemoryBackend` - Process-local Hash Table
//!
//! `TigerStyle`: Reference implementation of the storage contract, with
//! optional fault injection for deterministic simulation tests.
//!
//! # Concurrency
//!
//! The map sits behind an `RwLock`. Each operation holds the lock for its own
//! duration only, so concurrent appends to one key are serialised and none is
//! lost. No persistence across restarts.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::dst::FaultInjector;

use super::backend::StorageBackend;
use super::error::{StorageError, StorageResult};
use super::types::{BackendKind, Entry, HashKey};

/// What one key holds.
#[derive(Debug, Clone)]
enum Slot {
    Scalar(Value),
    Bucket(Vec<Entry>),
}

// =============================================================================
// InMemoryBackend
// =============================================================================

/// In-memory storage for one hash table.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    table_index: u32,
    slots: Arc<RwLock<HashMap<HashKey, Slot>>>,
    fault_injector: Option<Arc<FaultInjector>>,
}

impl InMemoryBackend {
    /// Create an empty backend for `table_index`.
    #[must_use]
    pub fn new(table_index: u32) -> Self {
        Self {
            table_index,
            slots: Arc::new(RwLock::new(HashMap::new())),
            fault_injector: None,
        }
    }

    /// Create a backend whose operations consult `fault_injector` first.
    ///
    /// Operations are named after the trait methods (`append_val`,
    /// `get_list`, ...) so faults can be filtered per operation.
    #[must_use]
    pub fn with_fault_injector(table_index: u32, fault_injector: Arc<FaultInjector>) -> Self {
        Self {
            fault_injector: Some(fault_injector),
            ..Self::new(table_index)
        }
    }

    /// Number of keys stored.
    ///
    /// # Errors
    /// Returns `Internal` if the map lock is poisoned.
    pub fn len(&self) -> StorageResult<usize> {
        Ok(self.read()?.len())
    }

    /// Whether no key is stored.
    ///
    /// # Errors
    /// Returns `Internal` if the map lock is poisoned.
    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn maybe_inject_fault(&self, operation: &str) -> StorageResult<()> {
        match self
            .fault_injector
            .as_ref()
            .and_then(|faults| faults.should_inject(operation))
        {
            Some(fault_type) => Err(StorageError::simulated_fault(format!(
                "{} during {operation}",
                fault_type.as_str()
            ))),
            None => Ok(()),
        }
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, HashMap<HashKey, Slot>>> {
        self.slots
            .read()
            .map_err(|_| StorageError::internal("in-memory table lock poisoned"))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, HashMap<HashKey, Slot>>> {
        self.slots
            .write()
            .map_err(|_| StorageError::internal("in-memory table lock poisoned"))
    }
}

#[async_trait]
impl StorageBackend for InMemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::InMemory
    }

    fn table_index(&self) -> u32 {
        self.table_index
    }

    async fn keys(&self) -> StorageResult<BTreeSet<HashKey>> {
        self.maybe_inject_fault("keys")?;

        Ok(self.read()?.keys().cloned().collect())
    }

    #[tracing::instrument(skip(self, value), fields(table = self.table_index, key = %key))]
    async fn set_val(&self, key: &HashKey, value: &Value) -> StorageResult<()> {
        self.maybe_inject_fault("set_val")?;

        self.write()?.insert(key.clone(), Slot::Scalar(value.clone()));
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(table = self.table_index, key = %key))]
    async fn get_val(&self, key: &HashKey) -> StorageResult<Value> {
        self.maybe_inject_fault("get_val")?;

        match self.read()?.get(key) {
            Some(Slot::Scalar(value)) => Ok(value.clone()),
            Some(Slot::Bucket(_)) => Err(StorageError::type_mismatch(key.as_str(), "scalar")),
            None => Err(StorageError::key_not_found(key.as_str())),
        }
    }

    #[tracing::instrument(skip(self, entry), fields(table = self.table_index, key = %key))]
    async fn append_val(&self, key: &HashKey, entry: &Entry) -> StorageResult<()> {
        self.maybe_inject_fault("append_val")?;

        let mut slots = self.write()?;
        match slots
            .entry(key.clone())
            .or_insert_with(|| Slot::Bucket(Vec::new()))
        {
            Slot::Bucket(bucket) => {
                bucket.push(entry.clone());
                Ok(())
            }
            Slot::Scalar(_) => Err(StorageError::type_mismatch(key.as_str(), "bucket")),
        }
    }

    #[tracing::instrument(skip(self), fields(table = self.table_index, key = %key))]
    async fn get_list(&self, key: &HashKey) -> StorageResult<Vec<Entry>> {
        self.maybe_inject_fault("get_list")?;

        match self.read()?.get(key) {
            Some(Slot::Bucket(bucket)) => Ok(bucket.clone()),
            Some(Slot::Scalar(_)) => Err(StorageError::type_mismatch(key.as_str(), "bucket")),
            None => Ok(Vec::new()),
        }
    }

    async fn clean(&self) -> StorageResult<()> {
        self.maybe_inject_fault("clean")?;

        self.write()?.clear();
        tracing::debug!(table = self.table_index, "in-memory table cleaned");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dst::{DeterministicRng, FaultConfig, FaultInjectorBuilder, FaultType};
    use serde_json::json;

    fn key(s: &str) -> HashKey {
        HashKey::new(s).unwrap()
    }

    // =========================================================================
    // Scalar Tests
    // =========================================================================

    #[tokio::test]
    async fn test_set_and_get_val() {
        let backend = InMemoryBackend::new(0);

        backend.set_val(&key("0101"), &json!("payload")).await.unwrap();
        assert_eq!(backend.get_val(&key("0101")).await.unwrap(), json!("payload"));

        backend.set_val(&key("0101"), &json!(7)).await.unwrap();
        assert_eq!(backend.get_val(&key("0101")).await.unwrap(), json!(7));
    }

    #[tokio::test]
    async fn test_get_val_missing() {
        let backend = InMemoryBackend::new(0);

        let err = backend.get_val(&key("1111")).await.unwrap_err();
        assert_eq!(err, StorageError::key_not_found("1111"));
    }

    // =========================================================================
    // Bucket Tests
    // =========================================================================

    #[tokio::test]
    async fn test_append_preserves_order() {
        let backend = InMemoryBackend::new(0);
        let k = key("aabbcc");

        backend
            .append_val(&k, &Entry::new(vec![1.0, 2.0, 3.0], "app1"))
            .await
            .unwrap();
        backend
            .append_val(&k, &Entry::new(vec![4.0, 5.0, 6.0], "app2"))
            .await
            .unwrap();

        let bucket = backend.get_list(&k).await.unwrap();
        assert_eq!(
            bucket,
            vec![
                Entry::new(vec![1.0, 2.0, 3.0], "app1"),
                Entry::new(vec![4.0, 5.0, 6.0], "app2"),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_list_missing_is_empty() {
        let backend = InMemoryBackend::new(0);
        assert!(backend.get_list(&key("0000")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scalar_and_bucket_do_not_mix() {
        let backend = InMemoryBackend::new(0);

        backend.set_val(&key("s"), &json!("x")).await.unwrap();
        backend
            .append_val(&key("b"), &Entry::new(vec![1.0], "y"))
            .await
            .unwrap();

        assert!(matches!(
            backend.get_list(&key("s")).await,
            Err(StorageError::TypeMismatch { .. })
        ));
        assert!(matches!(
            backend.append_val(&key("s"), &Entry::new(vec![1.0], "z")).await,
            Err(StorageError::TypeMismatch { .. })
        ));
        assert!(matches!(
            backend.get_val(&key("b")).await,
            Err(StorageError::TypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_keys_and_clean() {
        let backend = InMemoryBackend::new(3);

        backend.set_val(&key("01"), &json!(1)).await.unwrap();
        backend
            .append_val(&key("10"), &Entry::new(vec![0.5], json!(null)))
            .await
            .unwrap();
        backend
            .append_val(&key("10"), &Entry::new(vec![0.6], json!(null)))
            .await
            .unwrap();

        let keys = backend.keys().await.unwrap();
        assert_eq!(keys.into_iter().map(HashKey::into_inner).collect::<Vec<_>>(), vec!["01", "10"]);
        assert_eq!(backend.len().unwrap(), 2);

        backend.clean().await.unwrap();
        assert!(backend.is_empty().unwrap());
        assert!(backend.get_list(&key("10")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let backend = InMemoryBackend::new(0);
        let other = backend.clone();

        other
            .append_val(&key("k"), &Entry::new(vec![1.0], "shared"))
            .await
            .unwrap();
        assert_eq!(backend.get_list(&key("k")).await.unwrap().len(), 1);
        assert_eq!(backend.kind(), BackendKind::InMemory);
    }

    // =========================================================================
    // Fault Injection Tests
    // =========================================================================

    #[tokio::test]
    async fn test_fault_injection_on_filtered_operation() {
        let faults = FaultInjectorBuilder::new(DeterministicRng::new(42))
            .with_fault(FaultConfig::new(FaultType::StorageWriteFail, 1.0).with_filter("append"))
            .build();
        let backend = InMemoryBackend::with_fault_injector(0, Arc::new(faults));

        let err = backend
            .append_val(&key("k"), &Entry::new(vec![1.0], "x"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(matches!(err, StorageError::SimulatedFault { .. }));

        // Reads are unaffected and see no partial write
        assert!(backend.get_list(&key("k")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fault_injection_max_injections() {
        let faults = FaultInjectorBuilder::new(DeterministicRng::new(42))
            .with_fault(FaultConfig::new(FaultType::StorageReadFail, 1.0).with_max_injections(1))
            .build();
        let backend = InMemoryBackend::with_fault_injector(0, Arc::new(faults));

        assert!(backend.keys().await.is_err());
        assert!(backend.keys().await.unwrap().is_empty());
    }
}
