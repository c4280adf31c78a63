//! `DocumentStoreBackend` - MongoDB Hash Tables
//!
//! TigerStyle: One document per hash code, appends are a single atomic
//! `$push` so concurrent writers never overwrite each other.
//!
//! # Schema
//!
//! One collection per hash table (`<collection_prefix><table_index>`), with a
//! unique index on `hash_code`:
//!
//! ```text
//! { "hash_code": "<key>", "value": [ [<vector>, <extra_data>], ... ] }
//! ```
//!
//! # Entry Conversion
//!
//! Entries cross the BSON boundary through [`entry_to_bson`] and
//! [`entry_from_bson`] only. The conversion is lossy in two places:
//! integer vector components come back as `f64`, and BSON-only types inside
//! `extra_data` (dates, object ids) come back in relaxed extended JSON form.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions, UpdateOptions};
use mongodb::{Client, Collection, IndexModel};
use serde_json::Value;

use super::backend::StorageBackend;
use super::config::DocumentStoreConfig;
use super::error::{StorageError, StorageResult};
use super::types::{BackendKind, Entry, HashKey};
use crate::constants::{DOCUMENT_DUPLICATE_KEY_CODE, DOCUMENT_UPSERT_ATTEMPTS_MAX};

const HASH_CODE_FIELD: &str = "hash_code";
const VALUE_FIELD: &str = "value";

// =============================================================================
// DocumentStoreBackend
// =============================================================================

/// MongoDB storage for one hash table.
#[derive(Debug, Clone)]
pub struct DocumentStoreBackend {
    table_index: u32,
    collection: Collection<Document>,
    closed: Arc<AtomicBool>,
}

impl DocumentStoreBackend {
    /// Connect, verify the server answers, and ensure the `hash_code` index
    /// on the collection for `table_index`.
    ///
    /// # Errors
    /// Returns `Configuration` for invalid settings or URI and
    /// `BackendUnavailable` if the server cannot be reached.
    pub async fn connect(config: &DocumentStoreConfig, table_index: u32) -> StorageResult<Self> {
        config.validate()?;

        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| map_mongo_error(&e))?;
        let database = client.database(&config.database_name);

        database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| map_mongo_error(&e))?;

        let collection_name = config.collection_name(table_index);
        let collection = database.collection::<Document>(&collection_name);
        ensure_hash_code_index(&collection).await?;

        tracing::info!(
            database = %config.database_name,
            collection = %collection_name,
            "document store connected"
        );

        Ok(Self {
            table_index,
            collection,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Name of the collection holding this table.
    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.collection.name()
    }

    fn collection(&self) -> StorageResult<&Collection<Document>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::unavailable("document store backend is closed"));
        }
        Ok(&self.collection)
    }

    async fn find(&self, key: &HashKey) -> StorageResult<Option<Document>> {
        self.collection()?
            .find_one(doc! { HASH_CODE_FIELD: key.as_str() }, None)
            .await
            .map_err(|e| map_mongo_error(&e))
    }
}

/// Create the unique `hash_code` index if it is missing.
///
/// Racing first-time upserts stay single-document only while it exists.
async fn ensure_hash_code_index(collection: &Collection<Document>) -> StorageResult<()> {
    let index = IndexModel::builder()
        .keys(doc! { HASH_CODE_FIELD: 1 })
        .options(IndexOptions::builder().unique(true).build())
        .build();
    collection
        .create_index(index, None)
        .await
        .map_err(|e| map_mongo_error(&e))?;
    Ok(())
}

/// Options for listing keys: only the hash code of each document.
fn key_scan_options() -> FindOptions {
    FindOptions::builder()
        .projection(doc! { HASH_CODE_FIELD: 1, "_id": 0 })
        .build()
}

// =============================================================================
// Entry Conversion
// =============================================================================

/// Normalise an entry into the stored `[vector, extra_data]` array.
///
/// # Errors
/// Returns `Serialization` if a component is not finite or the payload
/// cannot be represented in BSON.
pub fn entry_to_bson(entry: &Entry) -> StorageResult<Bson> {
    if entry.vector.iter().any(|v| !v.is_finite()) {
        return Err(StorageError::serialization(
            "vector components must be finite",
        ));
    }
    let vector = entry.vector.iter().copied().map(Bson::Double).collect();
    Ok(Bson::Array(vec![Bson::Array(vector), value_to_bson(&entry.extra_data)?]))
}

/// Reconstruct an entry from a stored `[vector, extra_data]` array.
///
/// # Errors
/// Returns `Serialization` if the element is not a two-element array whose
/// first element is an array of numbers.
#[allow(clippy::cast_precision_loss)]
pub fn entry_from_bson(stored: &Bson) -> StorageResult<Entry> {
    let Bson::Array(pair) = stored else {
        return Err(StorageError::serialization(format!(
            "stored entry is not an array: {stored}"
        )));
    };
    let [vector, extra_data] = pair.as_slice() else {
        return Err(StorageError::serialization(format!(
            "stored entry has {} elements, expected 2",
            pair.len()
        )));
    };
    let Bson::Array(components) = vector else {
        return Err(StorageError::serialization(format!(
            "stored vector is not an array: {vector}"
        )));
    };

    let vector = components
        .iter()
        .map(|component| match component {
            Bson::Double(v) => Ok(*v),
            Bson::Int32(v) => Ok(f64::from(*v)),
            Bson::Int64(v) => Ok(*v as f64),
            other => Err(StorageError::serialization(format!(
                "vector component is not a number: {other}"
            ))),
        })
        .collect::<StorageResult<Vec<f64>>>()?;

    Ok(Entry {
        vector,
        extra_data: extra_data.clone().into_relaxed_extjson(),
    })
}

fn value_to_bson(value: &Value) -> StorageResult<Bson> {
    bson::to_bson(value).map_err(|e| StorageError::serialization(e.to_string()))
}

// =============================================================================
// Error Mapping
// =============================================================================

fn is_duplicate_key(err: &MongoError) -> bool {
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write)) => {
            write.code == DOCUMENT_DUPLICATE_KEY_CODE
        }
        ErrorKind::Command(command) => command.code == DOCUMENT_DUPLICATE_KEY_CODE,
        _ => false,
    }
}

/// Fold a driver error into the storage taxonomy.
fn map_mongo_error(err: &MongoError) -> StorageError {
    match &*err.kind {
        ErrorKind::Io(_)
        | ErrorKind::ServerSelection { .. }
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => StorageError::unavailable(err.to_string()),
        ErrorKind::InvalidArgument { .. } | ErrorKind::Authentication { .. } => {
            StorageError::configuration(err.to_string())
        }
        ErrorKind::BsonSerialization(_) | ErrorKind::BsonDeserialization(_) => {
            StorageError::serialization(err.to_string())
        }
        _ => StorageError::query(err.to_string()),
    }
}

// =============================================================================
// StorageBackend
// =============================================================================

#[async_trait]
impl StorageBackend for DocumentStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DocumentStore
    }

    fn table_index(&self) -> u32 {
        self.table_index
    }

    #[tracing::instrument(skip(self), fields(table = self.table_index))]
    async fn keys(&self) -> StorageResult<BTreeSet<HashKey>> {
        // Streamed: one `distinct` reply is capped at 16MB
        let mut cursor = self
            .collection()?
            .find(doc! {}, key_scan_options())
            .await
            .map_err(|e| map_mongo_error(&e))?;

        let mut keys = BTreeSet::new();
        while let Some(document) = cursor.try_next().await.map_err(|e| map_mongo_error(&e))? {
            if let Ok(code) = document.get_str(HASH_CODE_FIELD) {
                keys.insert(HashKey::from_store(code.to_string()));
            }
        }
        Ok(keys)
    }

    /// Upserts `{value: [value]}`, so repeated calls never create duplicate
    /// documents. The stored form is a one-element list, as for a fresh
    /// bucket.
    #[tracing::instrument(skip(self, value), fields(table = self.table_index, key = %key))]
    async fn set_val(&self, key: &HashKey, value: &Value) -> StorageResult<()> {
        let update = doc! { "$set": { VALUE_FIELD: Bson::Array(vec![value_to_bson(value)?]) } };
        let options = UpdateOptions::builder().upsert(true).build();

        self.collection()?
            .update_one(doc! { HASH_CODE_FIELD: key.as_str() }, update, options)
            .await
            .map_err(|e| map_mongo_error(&e))?;
        Ok(())
    }

    /// Returns the stored `value` list as JSON.
    #[tracing::instrument(skip(self), fields(table = self.table_index, key = %key))]
    async fn get_val(&self, key: &HashKey) -> StorageResult<Value> {
        let document = self
            .find(key)
            .await?
            .ok_or_else(|| StorageError::key_not_found(key.as_str()))?;

        document
            .get(VALUE_FIELD)
            .cloned()
            .map(Bson::into_relaxed_extjson)
            .ok_or_else(|| StorageError::key_not_found(key.as_str()))
    }

    #[tracing::instrument(skip(self, entry), fields(table = self.table_index, key = %key))]
    async fn append_val(&self, key: &HashKey, entry: &Entry) -> StorageResult<()> {
        let filter = doc! { HASH_CODE_FIELD: key.as_str() };
        let update = doc! { "$push": { VALUE_FIELD: entry_to_bson(entry)? } };
        let options = UpdateOptions::builder().upsert(true).build();
        let collection = self.collection()?;

        let mut attempt = 1;
        loop {
            match collection
                .update_one(filter.clone(), update.clone(), options.clone())
                .await
            {
                Ok(_) => return Ok(()),
                // Two first-time upserts raced on the unique index; the
                // winner created the document, so pushing again appends.
                Err(e) if is_duplicate_key(&e) && attempt < DOCUMENT_UPSERT_ATTEMPTS_MAX => {
                    tracing::warn!(key = %key, attempt, "upsert raced, re-issuing push");
                    attempt += 1;
                }
                Err(e) => return Err(map_mongo_error(&e)),
            }
        }
    }

    #[tracing::instrument(skip(self), fields(table = self.table_index, key = %key))]
    async fn get_list(&self, key: &HashKey) -> StorageResult<Vec<Entry>> {
        let Some(document) = self.find(key).await? else {
            return Ok(Vec::new());
        };

        let stored = document.get_array(VALUE_FIELD).map_err(|e| {
            StorageError::serialization(format!("document {key} has no value list: {e}"))
        })?;

        stored.iter().map(entry_from_bson).collect()
    }

    #[tracing::instrument(skip(self), fields(table = self.table_index))]
    async fn clean(&self) -> StorageResult<()> {
        let collection = self.collection()?;
        collection
            .drop(None)
            .await
            .map_err(|e| map_mongo_error(&e))?;
        // Dropping the collection drops its indexes too
        ensure_hash_code_index(collection).await?;

        tracing::debug!(
            table = self.table_index,
            collection = %self.collection.name(),
            "document store collection dropped"
        );
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        // The driver's pool shuts down when the last client handle drops.
        self.closed.store(true, Ordering::Release);
        tracing::debug!(table = self.table_index, "document store backend closed");
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_bson_shape() {
        let entry = Entry::new(vec![1.0, 2.0, 3.0], "app1");
        let stored = entry_to_bson(&entry).unwrap();

        assert_eq!(
            stored,
            Bson::Array(vec![
                Bson::Array(vec![Bson::Double(1.0), Bson::Double(2.0), Bson::Double(3.0)]),
                Bson::String("app1".to_string()),
            ])
        );
        assert_eq!(entry_from_bson(&stored).unwrap(), entry);
    }

    #[test]
    fn test_entry_from_bson_normalises_integers() {
        let stored = Bson::Array(vec![
            Bson::Array(vec![Bson::Int32(1), Bson::Int64(2), Bson::Double(3.5)]),
            Bson::Int32(9),
        ]);

        let entry = entry_from_bson(&stored).unwrap();
        assert_eq!(entry.vector, vec![1.0, 2.0, 3.5]);
        assert_eq!(entry.extra_data, json!(9));
    }

    #[test]
    fn test_structured_extra_data_survives() {
        let entry = Entry::new(vec![0.25], json!({"app": "app4", "tags": ["x", "y"], "n": 3}));
        let back = entry_from_bson(&entry_to_bson(&entry).unwrap()).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn test_entry_from_bson_rejects_bad_shapes() {
        let bad = [
            Bson::String("not an array".to_string()),
            Bson::Array(vec![Bson::Array(vec![])]),
            Bson::Array(vec![Bson::String("v".to_string()), Bson::Null]),
            Bson::Array(vec![Bson::Array(vec![Bson::String("1".to_string())]), Bson::Null]),
        ];

        for stored in &bad {
            assert!(matches!(
                entry_from_bson(stored),
                Err(StorageError::Serialization { .. })
            ));
        }
    }

    #[test]
    fn test_non_finite_vector_rejected() {
        let entry = Entry::new(vec![f64::INFINITY], "x");
        assert!(entry_to_bson(&entry).is_err());
    }

    #[test]
    fn test_key_scan_projects_hash_code_only() {
        let options = key_scan_options();
        assert_eq!(
            options.projection,
            Some(doc! { HASH_CODE_FIELD: 1, "_id": 0 })
        );
        assert!(options.limit.is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = DocumentStoreConfig::new().with_database_name("");
        let err = DocumentStoreBackend::connect(&config, 0).await.unwrap_err();
        assert!(matches!(err, StorageError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_uri() {
        let config = DocumentStoreConfig::new().with_uri("not-a-mongo-uri");
        let err = DocumentStoreBackend::connect(&config, 0).await.unwrap_err();
        assert!(matches!(err, StorageError::Configuration { .. }));
    }
}
