//! Backend Factory
//!
//! `TigerStyle`: One adapter per hash table, chosen by configuration.
//!
//! [`create_backend`] builds a single table-scoped backend; [`HashTables`]
//! owns the backends of a whole index, one per table index `0..N`.

use std::fmt;

use futures::future::{join_all, try_join_all};

use super::backend::StorageBackend;
use super::config::{CacheStoreConfig, DocumentStoreConfig, StorageConfig};
use super::error::{StorageError, StorageResult};
use super::memory::InMemoryBackend;
#[cfg(not(all(feature = "cache-store", feature = "document-store")))]
use super::types::BackendKind;
use crate::constants::HASH_TABLES_COUNT_MAX;

#[cfg(feature = "cache-store")]
use super::cache::CacheStoreBackend;
#[cfg(feature = "document-store")]
use super::document::DocumentStoreBackend;

// =============================================================================
// create_backend
// =============================================================================

/// Build the backend for `table_index` selected by `config`.
///
/// The cache store gets `table_index` as its database selector; the document
/// store appends it to the collection prefix.
///
/// # Errors
/// - `Configuration` if the selected payload is invalid
/// - `DependencyUnavailable` if the selected adapter was compiled out
/// - `BackendUnavailable` if a remote store cannot be reached
pub async fn create_backend(
    config: &StorageConfig,
    table_index: u32,
) -> StorageResult<Box<dyn StorageBackend>> {
    config.validate()?;

    let backend: Box<dyn StorageBackend> = match config {
        StorageConfig::InMemory => Box::new(InMemoryBackend::new(table_index)),
        StorageConfig::CacheStore(cache) => connect_cache_store(cache, table_index).await?,
        StorageConfig::DocumentStore(document) => {
            connect_document_store(document, table_index).await?
        }
    };

    tracing::debug!(backend = %config.kind(), table = table_index, "backend created");
    Ok(backend)
}

#[cfg(feature = "cache-store")]
async fn connect_cache_store(
    config: &CacheStoreConfig,
    table_index: u32,
) -> StorageResult<Box<dyn StorageBackend>> {
    Ok(Box::new(CacheStoreBackend::connect(config, table_index).await?))
}

#[cfg(not(feature = "cache-store"))]
#[allow(clippy::unused_async)]
async fn connect_cache_store(
    _config: &CacheStoreConfig,
    _table_index: u32,
) -> StorageResult<Box<dyn StorageBackend>> {
    Err(compiled_out(BackendKind::CacheStore))
}

#[cfg(feature = "document-store")]
async fn connect_document_store(
    config: &DocumentStoreConfig,
    table_index: u32,
) -> StorageResult<Box<dyn StorageBackend>> {
    Ok(Box::new(
        DocumentStoreBackend::connect(config, table_index).await?,
    ))
}

#[cfg(not(feature = "document-store"))]
#[allow(clippy::unused_async)]
async fn connect_document_store(
    _config: &DocumentStoreConfig,
    _table_index: u32,
) -> StorageResult<Box<dyn StorageBackend>> {
    Err(compiled_out(BackendKind::DocumentStore))
}

#[cfg(not(all(feature = "cache-store", feature = "document-store")))]
fn compiled_out(kind: BackendKind) -> StorageError {
    StorageError::dependency_unavailable(kind.as_str(), kind.feature().unwrap_or_default())
}

// =============================================================================
// HashTables
// =============================================================================

/// The backends of one LSH index, indexed by hash table.
pub struct HashTables {
    tables: Vec<Box<dyn StorageBackend>>,
}

impl HashTables {
    /// Open `num_tables` backends, one per table index, all from `config`.
    ///
    /// # Errors
    /// Returns `Configuration` if `num_tables` is zero or above
    /// `HASH_TABLES_COUNT_MAX`, otherwise the first error from
    /// [`create_backend`]. A stock Redis has 16 databases, so a cache store
    /// opens at most 16 tables before the server refuses the database.
    pub async fn open(config: &StorageConfig, num_tables: u32) -> StorageResult<Self> {
        if num_tables == 0 || num_tables > HASH_TABLES_COUNT_MAX {
            return Err(StorageError::configuration(format!(
                "num_tables must be in 1..={HASH_TABLES_COUNT_MAX}, got {num_tables}"
            )));
        }

        let tables =
            try_join_all((0..num_tables).map(|table_index| create_backend(config, table_index)))
                .await?;

        tracing::info!(backend = %config.kind(), num_tables, "hash tables opened");
        Ok(Self { tables })
    }

    /// Wrap backends that were built by hand, e.g. with fault injection.
    ///
    /// # Errors
    /// Returns `Configuration` if the list is empty, too long, or a backend's
    /// table index does not match its position.
    pub fn from_backends(tables: Vec<Box<dyn StorageBackend>>) -> StorageResult<Self> {
        if tables.is_empty() || tables.len() > HASH_TABLES_COUNT_MAX as usize {
            return Err(StorageError::configuration(format!(
                "expected 1..={HASH_TABLES_COUNT_MAX} backends, got {}",
                tables.len()
            )));
        }
        for (position, table) in tables.iter().enumerate() {
            if table.table_index() as usize != position {
                return Err(StorageError::configuration(format!(
                    "backend at position {position} serves table {}",
                    table.table_index()
                )));
            }
        }
        Ok(Self { tables })
    }

    /// Backend for `table_index`, if the index is in range.
    #[must_use]
    pub fn table(&self, table_index: u32) -> Option<&dyn StorageBackend> {
        let position = usize::try_from(table_index).ok()?;
        self.tables.get(position).map(|table| table.as_ref())
    }

    /// Number of hash tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Always false for a successfully opened set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Backends in table order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn StorageBackend> {
        self.tables.iter().map(|table| table.as_ref())
    }

    /// `clean` every table.
    ///
    /// # Errors
    /// Returns the first error; other tables may already be cleaned.
    pub async fn clean_all(&self) -> StorageResult<()> {
        try_join_all(self.iter().map(|table| table.clean())).await?;
        tracing::debug!(num_tables = self.len(), "all hash tables cleaned");
        Ok(())
    }

    /// `close` every table.
    ///
    /// # Errors
    /// Returns the first error; every table is still asked to close.
    pub async fn close(&self) -> StorageResult<()> {
        let results = join_all(self.iter().map(|table| table.close())).await;
        results.into_iter().collect()
    }
}

impl fmt::Debug for HashTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashTables")
            .field("len", &self.tables.len())
            .field("kind", &self.tables.first().map(|t| t.kind()))
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
