//! Strict CSP configuration record.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use strictcsp_core::{
    CryptoProvider, CspBuilder, HashAlgorithm, StrictDynamicOptions, token::UNSAFE_INLINE,
};

use crate::error::{ConfigError, Result};

/// Smallest nonce accepted by [`StrictCspConfig::validate`].
pub const MIN_NONCE_BITS: usize = 8;

/// How `<style>` elements and `style` attributes are trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StyleHashing {
    /// Styles are left to the base policy.
    Disabled,
    /// Style hashes are written into `style-src`.
    Enabled {
        #[serde(default = "default_true")]
        remove_unsafe_inline: bool,
    },
}

impl StyleHashing {
    pub fn is_enabled(&self) -> bool {
        matches!(self, StyleHashing::Enabled { .. })
    }

    pub fn removes_unsafe_inline(&self) -> bool {
        matches!(
            self,
            StyleHashing::Enabled {
                remove_unsafe_inline: true
            }
        )
    }
}

impl Default for StyleHashing {
    fn default() -> Self {
        StyleHashing::Enabled {
            remove_unsafe_inline: true,
        }
    }
}

/// Where hash manifests are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// File store root
    pub dir: PathBuf,
    /// Bounded wait for the flush lock, in milliseconds
    pub lock_timeout_ms: u64,
}

impl ManifestConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".strict-csp"),
            lock_timeout_ms: 10_000,
        }
    }
}

/// Strict CSP settings, resolved once at startup.
///
/// # Examples
///
/// ```
/// use strictcsp_config::{StrictCspConfig, StyleHashing};
///
/// let config = StrictCspConfig::from_toml_str(r#"
///     hash_algorithm = "sha384"
///     report_only = true
///
///     [styles]
///     mode = "disabled"
/// "#).unwrap();
///
/// assert!(config.report_only);
/// assert_eq!(config.styles, StyleHashing::Disabled);
/// assert_eq!(config.nonce_bits, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrictCspConfig {
    /// Digest used for script and style hashes
    pub hash_algorithm: HashAlgorithm,
    /// Nonce entropy in bits
    pub nonce_bits: usize,
    /// Sources placed after `'strict-dynamic'`
    pub fallback: Vec<String>,
    /// Append to `script-src` instead of replacing it
    pub extend_script_src: bool,
    /// Emit `Content-Security-Policy-Report-Only`
    pub report_only: bool,
    /// Base policy header value
    pub directives: String,
    pub styles: StyleHashing,
    pub manifest: ManifestConfig,
}

impl Default for StrictCspConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            nonce_bits: strictcsp_core::DEFAULT_NONCE_BITS,
            fallback: vec!["https:".to_string(), UNSAFE_INLINE.to_string()],
            extend_script_src: false,
            report_only: false,
            directives: String::new(),
            styles: StyleHashing::default(),
            manifest: ManifestConfig::default(),
        }
    }
}

impl StrictCspConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<()> {
        if self.nonce_bits < MIN_NONCE_BITS {
            return Err(ConfigError::Validation(format!(
                "nonce_bits must be at least {}, got {}",
                MIN_NONCE_BITS, self.nonce_bits
            )));
        }
        if self.nonce_bits % 8 != 0 {
            return Err(ConfigError::Validation(format!(
                "nonce_bits must be a multiple of 8, got {}",
                self.nonce_bits
            )));
        }
        if let Some(source) = self.fallback.iter().find(|s| s.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "fallback contains an empty source: {:?}",
                source
            )));
        }
        if self.manifest.dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "manifest.dir cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Crypto provider for the configured algorithm and nonce size.
    pub fn crypto_provider(&self) -> CryptoProvider {
        CryptoProvider::new()
            .with_algorithm(self.hash_algorithm)
            .with_nonce_bits(self.nonce_bits)
    }

    pub fn strict_dynamic_options(&self) -> StrictDynamicOptions {
        StrictDynamicOptions {
            fallback: self.fallback.clone(),
            extend_script_src: self.extend_script_src,
        }
    }

    /// Builder holding the configured base policy and report-only flag.
    pub fn base_builder(&self) -> CspBuilder {
        CspBuilder::from_header_value(&self.directives).with_report_only(self.report_only)
    }
}

fn default_true() -> bool {
    true
}
