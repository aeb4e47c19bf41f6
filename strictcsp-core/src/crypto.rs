//! Content hashes and nonces for strict policies.
//!
//! Hashes are computed over the exact UTF-8 bytes given; no line-ending or
//! whitespace normalization happens, so callers must pass the bytes the
//! browser will execute.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;
use std::str::FromStr;

use crate::error::{CryptoError, Result};

/// Default nonce entropy.
pub const DEFAULT_NONCE_BITS: usize = 128;

/// Digest algorithms accepted in CSP hash sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    /// Base64 digest of `bytes`, without the algorithm prefix.
    pub fn digest_base64(&self, bytes: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => STANDARD.encode(Sha256::digest(bytes)),
            HashAlgorithm::Sha384 => STANDARD.encode(Sha384::digest(bytes)),
            HashAlgorithm::Sha512 => STANDARD.encode(Sha512::digest(bytes)),
        }
    }

    /// `<algorithm>-<base64digest>` source for `text`.
    pub fn source(&self, text: &str) -> String {
        format!("{}-{}", self.as_str(), self.digest_base64(text.as_bytes()))
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pluggable source of hashes and nonces.
pub trait CspCrypto: Send + Sync {
    /// `<algorithm>-<base64digest>` of the UTF-8 bytes of `text`.
    fn hash(&self, text: &str) -> Result<String>;

    /// Random base64 nonce, without the `nonce-` prefix.
    fn nonce(&self) -> Result<String>;

    /// Algorithm used by [`CspCrypto::hash`].
    fn algorithm(&self) -> HashAlgorithm;
}

/// SHA-2 hashing with nonces drawn from the operating system RNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CryptoProvider {
    algorithm: HashAlgorithm,
    nonce_bits: usize,
}

impl CryptoProvider {
    /// sha256 hashes, 128-bit nonces.
    pub fn new() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            nonce_bits: DEFAULT_NONCE_BITS,
        }
    }

    /// Set the hash algorithm
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the nonce size in bits. Only whole bytes are used.
    pub fn with_nonce_bits(mut self, bits: usize) -> Self {
        self.nonce_bits = bits;
        self
    }

    pub fn nonce_bits(&self) -> usize {
        self.nonce_bits
    }

    /// Hash with an explicit algorithm, ignoring the configured one.
    pub fn hash_with(&self, text: &str, algorithm: HashAlgorithm) -> String {
        algorithm.source(text)
    }
}

impl Default for CryptoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CspCrypto for CryptoProvider {
    fn hash(&self, text: &str) -> Result<String> {
        Ok(self.algorithm.source(text))
    }

    fn nonce(&self) -> Result<String> {
        let len = self.nonce_bits / 8;
        if len == 0 {
            return Err(CryptoError::InvalidNonceLength(self.nonce_bits));
        }

        let mut bytes = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::Entropy(e.to_string()))?;

        Ok(STANDARD.encode(bytes))
    }

    fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }
}
