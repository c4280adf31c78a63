//! Hash table data model: keys, entries and backend kinds.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{StorageError, StorageResult};
use crate::constants::HASH_KEY_BYTES_MAX;

/// Opaque caller payload stored next to each vector.
pub type ExtraData = serde_json::Value;

// =============================================================================
// HashKey
// =============================================================================

/// Fixed-width binary hash code identifying one bucket of one hash table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashKey(String);

impl HashKey {
    /// Create a validated hash key.
    ///
    /// # Errors
    /// Returns `InvalidKey` if the key is empty or longer than
    /// `HASH_KEY_BYTES_MAX` bytes.
    pub fn new(key: impl Into<String>) -> StorageResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(StorageError::invalid_key("hash key cannot be empty"));
        }
        if key.len() > HASH_KEY_BYTES_MAX {
            return Err(StorageError::invalid_key(format!(
                "hash key is {} bytes, max {HASH_KEY_BYTES_MAX}",
                key.len()
            )));
        }
        Ok(Self(key))
    }

    /// Wrap a key read back from a store. Stores only hold keys that were
    /// validated on the way in, so this skips validation.
    #[cfg(any(feature = "cache-store", feature = "document-store"))]
    pub(crate) fn from_store(key: String) -> Self {
        Self(key)
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the key in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key is empty; never true for a validated key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the key, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HashKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for HashKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for HashKey {
    type Error = StorageError;

    fn try_from(value: &str) -> StorageResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for HashKey {
    type Error = StorageError;

    fn try_from(value: String) -> StorageResult<Self> {
        Self::new(value)
    }
}

// =============================================================================
// Entry
// =============================================================================

/// One indexed item: the original vector plus its caller payload.
///
/// Serialises as the two-element array `[vector, extra_data]`, the shape
/// shared by the cache-store codec and the document-store schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EntryRepr", into = "EntryRepr")]
pub struct Entry {
    /// The indexed numeric vector
    pub vector: Vec<f64>,
    /// Opaque payload returned alongside the vector on lookup
    pub extra_data: ExtraData,
}

#[derive(Serialize, Deserialize)]
struct EntryRepr(Vec<f64>, ExtraData);

impl From<EntryRepr> for Entry {
    fn from(repr: EntryRepr) -> Self {
        Self {
            vector: repr.0,
            extra_data: repr.1,
        }
    }
}

impl From<Entry> for EntryRepr {
    fn from(entry: Entry) -> Self {
        Self(entry.vector, entry.extra_data)
    }
}

impl Entry {
    /// Create an entry. Vectors of any length are accepted.
    #[must_use]
    pub fn new(vector: Vec<f64>, extra_data: impl Into<ExtraData>) -> Self {
        Self {
            vector,
            extra_data: extra_data.into(),
        }
    }

    /// Create an entry with no payload.
    #[must_use]
    pub fn without_extra_data(vector: Vec<f64>) -> Self {
        Self::new(vector, ExtraData::Null)
    }
}

// =============================================================================
// BackendKind
// =============================================================================

/// Which adapter a backend instance is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Process-local map
    InMemory,
    /// Redis-style key/value cache
    CacheStore,
    /// MongoDB-style document database
    DocumentStore,
}

impl BackendKind {
    /// Stable name, matching the configuration tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InMemory => "in_memory",
            Self::CacheStore => "cache_store",
            Self::DocumentStore => "document_store",
        }
    }

    /// Cargo feature that compiles this backend in, if any.
    #[must_use]
    pub fn feature(&self) -> Option<&'static str> {
        match self {
            Self::InMemory => None,
            Self::CacheStore => Some("cache-store"),
            Self::DocumentStore => Some("document-store"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_key_validation() {
        assert!(HashKey::new("010110").is_ok());
        assert!(matches!(
            HashKey::new(""),
            Err(StorageError::InvalidKey { .. })
        ));
        assert!(matches!(
            HashKey::new("1".repeat(HASH_KEY_BYTES_MAX + 1)),
            Err(StorageError::InvalidKey { .. })
        ));
        assert!(HashKey::new("1".repeat(HASH_KEY_BYTES_MAX)).is_ok());
    }

    #[test]
    fn test_hash_key_try_from() {
        let key = HashKey::try_from("aabbcc").unwrap();
        assert_eq!(key.as_str(), "aabbcc");
        assert_eq!(key.to_string(), "aabbcc");
        assert_eq!(key.len(), 6);
    }

    #[test]
    fn test_entry_serializes_as_pair() {
        let entry = Entry::new(vec![1.0, 2.0, 3.0], "app1");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value, json!([[1.0, 2.0, 3.0], "app1"]));

        let back: Entry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_entry_accepts_integer_vectors() {
        let entry: Entry = serde_json::from_value(json!([[1, 2, 3], {"id": 7}])).unwrap();
        assert_eq!(entry.vector, vec![1.0, 2.0, 3.0]);
        assert_eq!(entry.extra_data, json!({"id": 7}));
    }

    #[test]
    fn test_entry_rejects_wrong_shape() {
        assert!(serde_json::from_value::<Entry>(json!([[1.0]])).is_err());
        assert!(serde_json::from_value::<Entry>(json!({"vector": [1.0]})).is_err());
    }

    #[test]
    fn test_entry_accepts_wide_vectors() {
        let entry = Entry::without_extra_data(vec![0.25; 100_000]);
        assert_eq!(entry.vector.len(), 100_000);

        let back: Entry = serde_json::from_value(serde_json::to_value(&entry).unwrap()).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_backend_kind_names() {
        assert_eq!(BackendKind::InMemory.as_str(), "in_memory");
        assert_eq!(BackendKind::CacheStore.feature(), Some("cache-store"));
        assert_eq!(BackendKind::DocumentStore.to_string(), "document_store");
        assert_eq!(BackendKind::InMemory.feature(), None);
    }
}
