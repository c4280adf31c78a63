//! Storage Configuration
//!
//! `TigerStyle`: Sensible defaults, builder pattern, explicit over implicit.
//!
//! One tagged variant per backend kind, each with its own typed payload:
//!
//! ```json
//! {"backend": "in_memory"}
//! {"backend": "cache_store", "host": "127.0.0.1", "port": 6379}
//! {"backend": "document_store", "uri": "mongodb://127.0.0.1:27017",
//!  "database_name": "lshdb", "collection_prefix": "lsh_"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{StorageError, StorageResult};
use super::types::BackendKind;
use crate::constants::{
    CACHE_STORE_DB_DEFAULT, CACHE_STORE_HOST_DEFAULT, CACHE_STORE_PORT_DEFAULT,
    DOCUMENT_STORE_COLLECTION_PREFIX_DEFAULT, DOCUMENT_STORE_DATABASE_DEFAULT,
    DOCUMENT_STORE_URI_DEFAULT,
};

// =============================================================================
// StorageConfig
// =============================================================================

/// Which backend stores the hash tables, with its connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Process-local maps, one per table
    InMemory,
    /// Redis; each table gets its own database index
    CacheStore(CacheStoreConfig),
    /// MongoDB; each table gets its own collection
    DocumentStore(DocumentStoreConfig),
}

/// Legacy discriminant names, tried in precedence order.
const IN_MEMORY_KEYS: [&str; 2] = ["in_memory", "dict"];
const CACHE_STORE_KEYS: [&str; 2] = ["cache_store", "redis"];
const DOCUMENT_STORE_KEYS: [&str; 2] = ["document_store", "mongodb"];

impl StorageConfig {
    /// The backend kind this configuration selects.
    #[must_use]
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::InMemory => BackendKind::InMemory,
            Self::CacheStore(_) => BackendKind::CacheStore,
            Self::DocumentStore(_) => BackendKind::DocumentStore,
        }
    }

    /// Parse a loosely typed configuration map.
    ///
    /// Accepts either the tagged form (`{"backend": "cache_store", ...}`) or a
    /// map keyed by backend name, e.g. `{"redis": {"host": "..."}}`. Key
    /// probing follows the precedence in-memory, cache store, document store;
    /// lower-precedence keys are ignored when a higher one is present.
    ///
    /// # Errors
    /// Returns `Configuration` if no backend key is present or the selected
    /// payload does not parse.
    pub fn from_value(value: Value) -> StorageResult<Self> {
        let Value::Object(map) = value else {
            return Err(StorageError::configuration(
                "storage configuration must be an object",
            ));
        };

        if map.contains_key("backend") {
            let config: Self = serde_json::from_value(Value::Object(map))
                .map_err(|e| StorageError::configuration(e.to_string()))?;
            config.validate()?;
            return Ok(config);
        }

        let find = |names: &[&str]| names.iter().find_map(|name| map.get(*name)).cloned();

        let config = if find(&IN_MEMORY_KEYS).is_some() {
            Self::InMemory
        } else if let Some(payload) = find(&CACHE_STORE_KEYS) {
            Self::CacheStore(parse_payload(payload, BackendKind::CacheStore)?)
        } else if let Some(payload) = find(&DOCUMENT_STORE_KEYS) {
            Self::DocumentStore(parse_payload(payload, BackendKind::DocumentStore)?)
        } else {
            return Err(StorageError::configuration(
                "no storage backend configured (expected in_memory, cache_store or document_store)",
            ));
        };

        config.validate()?;
        Ok(config)
    }

    /// Check every field of the selected payload.
    ///
    /// # Errors
    /// Returns `Configuration` describing the first invalid field.
    pub fn validate(&self) -> StorageResult<()> {
        match self {
            Self::InMemory => Ok(()),
            Self::CacheStore(config) => config.validate(),
            Self::DocumentStore(config) => config.validate(),
        }
    }
}

/// A `null` payload means "all defaults", as in `{"redis": null}`.
fn parse_payload<T>(payload: Value, kind: BackendKind) -> StorageResult<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if payload.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(payload)
        .map_err(|e| StorageError::configuration(format!("invalid {kind} configuration: {e}")))
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::InMemory
    }
}

// =============================================================================
// CacheStoreConfig
// =============================================================================

/// Connection settings for the Redis cache store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheStoreConfig {
    /// Server host name or address.
    ///
    /// Default: 127.0.0.1
    pub host: String,

    /// Server port.
    ///
    /// Default: 6379
    pub port: u16,

    /// ACL user name, if the server requires one.
    pub username: Option<String>,

    /// Password, if the server requires one.
    pub password: Option<String>,

    /// Database selector. Overwritten with the table index by the factory.
    ///
    /// A stock server exposes databases 0..=15 (`databases` in redis.conf),
    /// so it holds at most 16 tables; a higher index fails to connect with
    /// `Configuration`.
    ///
    /// Default: 0
    pub db: i64,
}

impl Default for CacheStoreConfig {
    fn default() -> Self {
        Self {
            host: CACHE_STORE_HOST_DEFAULT.to_string(),
            port: CACHE_STORE_PORT_DEFAULT,
            username: None,
            password: None,
            db: CACHE_STORE_DB_DEFAULT,
        }
    }
}

impl CacheStoreConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set user name and password.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: Option<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username;
        self.password = Some(password.into());
        self
    }

    /// Copy of this config pointed at the database for `table_index`.
    #[must_use]
    pub fn for_table(&self, table_index: u32) -> Self {
        Self {
            db: i64::from(table_index),
            ..self.clone()
        }
    }

    /// Check the settings.
    ///
    /// # Errors
    /// Returns `Configuration` for an empty host, port 0 or a negative db.
    pub fn validate(&self) -> StorageResult<()> {
        if self.host.is_empty() {
            return Err(StorageError::configuration("cache store host cannot be empty"));
        }
        if self.port == 0 {
            return Err(StorageError::configuration("cache store port must be positive"));
        }
        if self.db < 0 {
            return Err(StorageError::configuration(format!(
                "cache store db must be non-negative, got {}",
                self.db
            )));
        }
        Ok(())
    }
}

// =============================================================================
// DocumentStoreConfig
// =============================================================================

/// Connection settings for the MongoDB document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentStoreConfig {
    /// Server URI, passed to the driver unchanged.
    ///
    /// Default: mongodb://127.0.0.1:27017
    #[serde(alias = "db_uri")]
    pub uri: String,

    /// Database holding the table collections.
    ///
    /// Default: lshdb
    #[serde(alias = "db_name")]
    pub database_name: String,

    /// Collection name prefix; the table index is appended to it.
    ///
    /// Default: lsh_
    pub collection_prefix: String,
}

impl Default for DocumentStoreConfig {
    fn default() -> Self {
        Self {
            uri: DOCUMENT_STORE_URI_DEFAULT.to_string(),
            database_name: DOCUMENT_STORE_DATABASE_DEFAULT.to_string(),
            collection_prefix: DOCUMENT_STORE_COLLECTION_PREFIX_DEFAULT.to_string(),
        }
    }
}

impl DocumentStoreConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server URI.
    #[must_use]
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    /// Set the database name.
    #[must_use]
    pub fn with_database_name(mut self, name: impl Into<String>) -> Self {
        self.database_name = name.into();
        self
    }

    /// Set the collection prefix.
    #[must_use]
    pub fn with_collection_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.collection_prefix = prefix.into();
        self
    }

    /// Collection that stores `table_index`.
    #[must_use]
    pub fn collection_name(&self, table_index: u32) -> String {
        format!("{}{table_index}", self.collection_prefix)
    }

    /// Check the settings.
    ///
    /// # Errors
    /// Returns `Configuration` for an empty URI or database name.
    pub fn validate(&self) -> StorageResult<()> {
        if self.uri.is_empty() {
            return Err(StorageError::configuration("document store uri cannot be empty"));
        }
        if self.database_name.is_empty() {
            return Err(StorageError::configuration(
                "document store database name cannot be empty",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
