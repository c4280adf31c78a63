//! `CacheStoreBackend` - Redis Hash Tables
//!
//! TigerStyle: Every operation is a single Redis command, so atomicity comes
//! from the server.
//!
//! # Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CacheStoreBackend                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Connection: redis::aio::ConnectionManager (auto-reconnect)  │
//! │  Database:   SELECT <table_index>, one db per hash table     │
//! │  Scalars:    SET / GET    key -> codec(value)                │
//! │  Buckets:    RPUSH / LRANGE key -> [codec(entry), ...]       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, ConnectionAddr, ConnectionInfo, RedisConnectionInfo, RedisError};
use serde_json::Value;

use super::backend::StorageBackend;
use super::codec;
use super::config::CacheStoreConfig;
use super::error::{StorageError, StorageResult};
use super::types::{BackendKind, Entry, HashKey};
use crate::constants::CACHE_STORE_SCAN_BATCH_COUNT;

/// Server error code for an operation against the wrong value type.
const WRONG_TYPE_CODE: &str = "WRONGTYPE";

// =============================================================================
// CacheStoreBackend
// =============================================================================

/// Redis storage for one hash table.
///
/// The table owns the whole database selected by its index; `clean` flushes
/// that database.
#[derive(Clone)]
pub struct CacheStoreBackend {
    table_index: u32,
    manager: ConnectionManager,
    closed: Arc<AtomicBool>,
}

impl std::fmt::Debug for CacheStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStoreBackend")
            .field("table_index", &self.table_index)
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl CacheStoreBackend {
    /// Connect to Redis and select the database for `table_index`.
    ///
    /// The `db` field of `config` is ignored; the table index is the
    /// database selector.
    ///
    /// # Errors
    /// Returns `Configuration` for invalid settings and `BackendUnavailable`
    /// if the server cannot be reached.
    pub async fn connect(config: &CacheStoreConfig, table_index: u32) -> StorageResult<Self> {
        let config = config.for_table(table_index);
        config.validate()?;

        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: RedisConnectionInfo {
                db: config.db,
                username: config.username.clone(),
                password: config.password.clone(),
                ..Default::default()
            },
        };

        let client = redis::Client::open(info).map_err(|e| {
            StorageError::configuration(format!("invalid cache store settings: {e}"))
        })?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| map_connect_error(&e, &config))?;

        tracing::info!(
            host = %config.host,
            port = config.port,
            db = config.db,
            "cache store connected"
        );

        Ok(Self {
            table_index,
            manager,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// A connection handle, or `BackendUnavailable` once closed.
    fn connection(&self) -> StorageResult<ConnectionManager> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StorageError::unavailable("cache store backend is closed"));
        }
        Ok(self.manager.clone())
    }
}

/// Fold a connection setup error into the storage taxonomy.
///
/// Setup runs `AUTH` and `SELECT`; the server refusing either is a settings
/// problem, e.g. a table index beyond the server's `databases` count.
fn map_connect_error(err: &RedisError, config: &CacheStoreConfig) -> StorageError {
    match err.kind() {
        redis::ErrorKind::ResponseError => StorageError::configuration(format!(
            "cache store refused database {} (a stock server has 0..=15): {err}",
            config.db
        )),
        redis::ErrorKind::AuthenticationFailed => {
            StorageError::configuration(format!("cache store authentication failed: {err}"))
        }
        _ => StorageError::unavailable(format!(
            "failed to connect to {}:{}: {err}",
            config.host, config.port
        )),
    }
}

/// Fold a Redis error into the storage taxonomy.
fn map_redis_error(err: &RedisError, key: Option<&HashKey>, expected: &str) -> StorageError {
    if err.code() == Some(WRONG_TYPE_CODE) {
        return StorageError::type_mismatch(key.map_or("", HashKey::as_str), expected);
    }
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        return StorageError::unavailable(err.to_string());
    }
    StorageError::query(err.to_string())
}

#[async_trait]
impl StorageBackend for CacheStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CacheStore
    }

    fn table_index(&self) -> u32 {
        self.table_index
    }

    #[tracing::instrument(skip(self), fields(table = self.table_index))]
    async fn keys(&self) -> StorageResult<BTreeSet<HashKey>> {
        let mut conn = self.connection()?;
        let mut keys = BTreeSet::new();
        let mut cursor: u64 = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("COUNT")
                .arg(CACHE_STORE_SCAN_BATCH_COUNT)
                .query_async(&mut conn)
                .await
                .map_err(|e| map_redis_error(&e, None, "keys"))?;

            keys.extend(batch.into_iter().map(HashKey::from_store));

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(keys)
    }

    #[tracing::instrument(skip(self, value), fields(table = self.table_index, key = %key))]
    async fn set_val(&self, key: &HashKey, value: &Value) -> StorageResult<()> {
        let encoded = codec::encode_value(value)?;
        let mut conn = self.connection()?;

        let _: () = conn
            .set(key.as_str(), encoded)
            .await
            .map_err(|e| map_redis_error(&e, Some(key), "scalar"))?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(table = self.table_index, key = %key))]
    async fn get_val(&self, key: &HashKey) -> StorageResult<Value> {
        let mut conn = self.connection()?;

        let raw: Option<String> = conn
            .get(key.as_str())
            .await
            .map_err(|e| map_redis_error(&e, Some(key), "scalar"))?;

        match raw {
            Some(raw) => codec::decode_value(&raw),
            None => Err(StorageError::key_not_found(key.as_str())),
        }
    }

    #[tracing::instrument(skip(self, entry), fields(table = self.table_index, key = %key))]
    async fn append_val(&self, key: &HashKey, entry: &Entry) -> StorageResult<()> {
        let encoded = codec::encode_entry(entry)?;
        let mut conn = self.connection()?;

        let _: i64 = conn
            .rpush(key.as_str(), encoded)
            .await
            .map_err(|e| map_redis_error(&e, Some(key), "bucket"))?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(table = self.table_index, key = %key))]
    async fn get_list(&self, key: &HashKey) -> StorageResult<Vec<Entry>> {
        let mut conn = self.connection()?;

        // LRANGE on a missing key is an empty list, not an error
        let raw: Vec<String> = conn
            .lrange(key.as_str(), 0, -1)
            .await
            .map_err(|e| map_redis_error(&e, Some(key), "bucket"))?;

        codec::decode_bucket(raw)
    }

    #[tracing::instrument(skip(self), fields(table = self.table_index))]
    async fn clean(&self) -> StorageResult<()> {
        let mut conn = self.connection()?;

        let _: () = redis::cmd("FLUSHDB")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error(&e, None, "database"))?;

        tracing::debug!(table = self.table_index, "cache store database flushed");
        Ok(())
    }

    async fn close(&self) -> StorageResult<()> {
        // The manager's connection is released when the last clone drops;
        // marking closed stops this handle from issuing further commands.
        self.closed.store(true, Ordering::Release);
        tracing::debug!(table = self.table_index, "cache store backend closed");
        Ok(())
    }
}
