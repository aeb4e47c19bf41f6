//! Error types for hashing and nonce generation.

use thiserror::Error;

/// Result type for crypto provider operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Failures that must never degrade into a missing hash or nonce.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Algorithm outside sha256/sha384/sha512.
    #[error("Unsupported hash algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Nonce size that yields fewer than one byte of entropy.
    #[error("Invalid nonce length: {0} bits (minimum is 8)")]
    InvalidNonceLength(usize),

    /// The operating system entropy source failed.
    #[error("Entropy source unavailable: {0}")]
    Entropy(String),
}
