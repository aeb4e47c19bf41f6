//! Manifest error types.

use std::time::Duration;
use strictcsp_core::CryptoError;
use thiserror::Error;

/// Result type for manifest operations.
pub type Result<T> = std::result::Result<T, ManifestError>;

/// Manifest collection and persistence errors.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The flush lock was not acquired within the bounded wait.
    #[error("Timed out after {timeout:?} waiting for the manifest lock of route '{route}'")]
    LockTimeout {
        /// Route whose manifest was being flushed.
        route: String,
        /// Configured wait.
        timeout: Duration,
    },

    /// Value collected as a hash is not `<sha256|sha384|sha512>-<digest>`.
    #[error("Invalid hash source: {0}")]
    InvalidHash(String),

    /// Hashing failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted manifest could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage backend error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ManifestError {
    /// Check if this is a lock timeout.
    pub fn is_lock_timeout(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}
