//! # Strict CSP Config
//!
//! Configuration for strict Content Security Policies, loaded from TOML or
//! JSON files and overridden by `STRICT_CSP_*` environment variables.
//!
//! ## Features
//!
//! - ✅ **File loading** - TOML and JSON, format chosen by extension
//! - ✅ **Environment overrides** - `STRICT_CSP_*` variables win over the file
//! - ✅ **Validation** - algorithm and nonce size checked before use
//! - ✅ **Typed style options** - tagged [`StyleHashing`] record
//!
//! ## Quick Start
//!
//! ```rust
//! use strictcsp_config::StrictCspConfig;
//!
//! let mut config = StrictCspConfig::from_json_str(r#"{"nonce_bits": 192}"#).unwrap();
//! config.apply_env_vars([("STRICT_CSP_REPORT_ONLY", "true")]).unwrap();
//! config.validate().unwrap();
//!
//! assert!(config.report_only);
//! assert_eq!(config.crypto_provider().nonce_bits(), 192);
//! ```

pub mod config;
pub mod env;
pub mod error;
pub mod loader;

pub use config::{MIN_NONCE_BITS, ManifestConfig, StrictCspConfig, StyleHashing};
pub use env::ENV_PREFIX;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
