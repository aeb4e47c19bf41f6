//! Strict policy derivation errors.

use strictcsp_core::CryptoError;
use strictcsp_manifest::ManifestError;
use thiserror::Error;

/// Result type for strict policy derivation.
pub type Result<T> = std::result::Result<T, StrictCspError>;

/// Failures that prevent a strict policy from being computed.
///
/// All of them are fatal for the request: the response should be blocked
/// rather than served without the requested policy.
#[derive(Debug, Error)]
pub enum StrictCspError {
    /// Hashing or nonce generation failed.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Manifest could not be read or flushed.
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Configuration could not be loaded or is invalid.
    #[cfg(feature = "config")]
    #[error("Configuration error: {0}")]
    Config(#[from] strictcsp_config::ConfigError),
}

impl StrictCspError {
    /// HTTP status for a response whose policy could not be computed.
    pub fn status_code(&self) -> u16 {
        500
    }
}
