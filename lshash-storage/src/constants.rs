//! `TigerStyle` Constants
//!
//! All limits use big-endian naming: `CATEGORY_SPECIFICS_UNIT_LIMIT`
//! Example: `HASH_KEY_BYTES_MAX` (not `MAX_HASH_KEY_BYTES`)
//!
//! Every constant includes units in the name:
//! - _`BYTES_MAX/MIN` for size limits
//! - _`COUNT_MAX` for quantity limits
//! - _`DEFAULT` for configuration defaults

// =============================================================================
// Hash Table Limits
// =============================================================================

/// Maximum length of a hash key (one bit per character for 1024-bit hashes)
pub const HASH_KEY_BYTES_MAX: usize = 1024;

/// Maximum number of hash tables a single index may open
pub const HASH_TABLES_COUNT_MAX: u32 = 256;

// =============================================================================
// Cache Store (Redis)
// =============================================================================

/// Default cache store host
pub const CACHE_STORE_HOST_DEFAULT: &str = "127.0.0.1";

/// Default cache store port
pub const CACHE_STORE_PORT_DEFAULT: u16 = 6379;

/// Default database selector before a table index is injected
pub const CACHE_STORE_DB_DEFAULT: i64 = 0;

/// Number of keys requested per SCAN round trip
pub const CACHE_STORE_SCAN_BATCH_COUNT: usize = 1_000;

// =============================================================================
// Document Store (MongoDB)
// =============================================================================

/// Default document store URI
pub const DOCUMENT_STORE_URI_DEFAULT: &str = "mongodb://127.0.0.1:27017";

/// Default database name
pub const DOCUMENT_STORE_DATABASE_DEFAULT: &str = "lshdb";

/// Default collection prefix; the table index is appended to it
pub const DOCUMENT_STORE_COLLECTION_PREFIX_DEFAULT: &str = "lsh_";

/// Attempts for a push-upsert that races another first-time upsert
pub const DOCUMENT_UPSERT_ATTEMPTS_MAX: u32 = 3;

/// Server error code for a unique index violation
pub const DOCUMENT_DUPLICATE_KEY_CODE: i32 = 11_000;

// =============================================================================
// DST (Deterministic Simulation Testing)
// =============================================================================

/// Maximum probability for fault injection (1.0 = 100%)
pub const DST_FAULT_PROBABILITY_MAX: f64 = 1.0;

// =============================================================================
// Tests
// =============================================================================
