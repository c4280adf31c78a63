//! Storage Errors
//!
//! `TigerStyle`: Explicit error types with context. Every driver error is
//! folded into [`StorageError`] so callers never see store-specific types.

use thiserror::Error;

/// Errors from hash table storage operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StorageError {
    /// No recognised backend in the configuration, or an invalid one
    #[error("configuration error: {message}")]
    Configuration {
        /// What was wrong with the configuration
        message: String,
    },

    /// The selected backend was not compiled into this build
    #[error("{backend} backend unavailable: enable the `{feature}` feature")]
    DependencyUnavailable {
        /// Backend name
        backend: String,
        /// Cargo feature that provides it
        feature: String,
    },

    /// Scalar read on a key that holds nothing
    #[error("key not found: {key}")]
    KeyNotFound {
        /// Missing hash key
        key: String,
    },

    /// The remote store could not be reached
    #[error("backend unavailable: {message}")]
    BackendUnavailable {
        /// Connectivity failure description
        message: String,
    },

    /// A key holds a scalar where a bucket was expected, or the reverse
    #[error("type mismatch at {key}: expected {expected}")]
    TypeMismatch {
        /// Offending hash key
        key: String,
        /// What the operation expected to find
        expected: String,
    },

    /// Hash key failed validation
    #[error("invalid key: {message}")]
    InvalidKey {
        /// Validation error message
        message: String,
    },

    /// The store rejected an operation
    #[error("query error: {message}")]
    Query {
        /// Query error message
        message: String,
    },

    /// Encoding or decoding a stored value failed
    #[error("serialization error: {message}")]
    Serialization {
        /// Codec error message
        message: String,
    },

    /// Simulated fault (for DST)
    #[error("simulated fault: {fault_type}")]
    SimulatedFault {
        /// Type of simulated fault
        fault_type: String,
    },

    /// Internal error
    #[error("internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl StorageError {
    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a dependency-unavailable error.
    #[must_use]
    pub fn dependency_unavailable(backend: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::DependencyUnavailable {
            backend: backend.into(),
            feature: feature.into(),
        }
    }

    /// Create a key-not-found error.
    #[must_use]
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Create a backend-unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Create a type mismatch error.
    #[must_use]
    pub fn type_mismatch(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected: expected.into(),
        }
    }

    /// Create an invalid key error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Create a query error.
    #[must_use]
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a simulated fault error.
    #[must_use]
    pub fn simulated_fault(fault_type: impl Into<String>) -> Self {
        Self::SimulatedFault {
            fault_type: fault_type.into(),
        }
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this is a transient error (a retry may succeed).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable { .. } | Self::SimulatedFault { .. }
        )
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
