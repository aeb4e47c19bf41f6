//! # Strict CSP Core
//!
//! Content Security Policy model, header codec, directive algebra and the
//! strict-policy builder.
//!
//! ## Features
//!
//! - ✅ **Lossless codec** - parse and serialize `Content-Security-Policy` values
//! - ✅ **Directive algebra** - append, prepend and override merges, value filtering
//! - ✅ **Strict policies** - `'strict-dynamic'` with hashes or a per-request nonce
//! - ✅ **Style hashes** - `style-src` hashing with optional `'unsafe-inline'` removal
//! - ✅ **Crypto provider** - sha256/384/512 hashes and OS-random nonces
//!
//! ## Quick Start
//!
//! ```rust
//! use strictcsp_core::{CspBuilder, CSP_HEADER_REPORT_ONLY};
//!
//! let builder = CspBuilder::from_header_value("default-src 'self'; object-src 'none'")
//!     .with_directives("img-src data: https:")
//!     .with_strict_dynamic(["sha256-abcdef"])
//!     .with_report_only(true);
//!
//! let (name, value) = builder.to_header_key_value();
//! assert_eq!(name, CSP_HEADER_REPORT_ONLY);
//! assert!(value.contains("script-src 'strict-dynamic' https: 'unsafe-inline' 'sha256-abcdef'"));
//! ```
//!
//! ## Nonces
//!
//! ```rust
//! use strictcsp_core::{CryptoProvider, CspBuilder, CspCrypto};
//!
//! let crypto = CryptoProvider::new();
//! let nonce = crypto.nonce().unwrap();
//!
//! let builder = CspBuilder::from_header_value("style-src 'self'")
//!     .with_strict_dynamic(nonce.as_str());
//! assert!(builder.has_directive_with_pattern("script-src", format!("nonce-{}", nonce)));
//! assert!(builder.has_directive_with_pattern("style-src", format!("nonce-{}", nonce)));
//! ```

pub mod algebra;
pub mod builder;
pub mod codec;
pub mod crypto;
pub mod directive;
pub mod error;
pub mod token;

pub use algebra::{DirectivePatterns, MergeMode, ValueMatcher, ValuePattern};
pub use builder::{Csp, CspBuilder, StrictDynamicOptions, StrictSources};
pub use crypto::{CryptoProvider, CspCrypto, DEFAULT_NONCE_BITS, HashAlgorithm};
pub use directive::{
    CSP_HEADER, CSP_HEADER_REPORT_ONLY, DirectiveKind, DirectiveName, DirectiveValue, Directives,
};
pub use error::{CryptoError, Result};
pub use token::SourceKind;
