//! # Strict CSP
//!
//! Strict Content Security Policies for server-rendered pages.
//!
//! Policies are built with a chainable [`CspBuilder`] over an ordered
//! directive model, script and style hashes are collected per route while
//! pages render, and each request gets a `'strict-dynamic'` policy trusted
//! either by those hashes or by a fresh nonce.
//!
//! ## Features
//!
//! - ✅ **Header codec** - lossless `Content-Security-Policy` parse/serialize
//! - ✅ **Directive algebra** - append, prepend and override merges, value filtering
//! - ✅ **Hash manifests** - per-route script and style hashes with lock-guarded persistence
//! - ✅ **Strict derivation** - hash strategy for static routes, nonce strategy otherwise
//! - ✅ **Configuration** - TOML/JSON files and `STRICT_CSP_*` overrides (`config` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use strictcsp::prelude::*;
//!
//! // Collect hashes while rendering a static page.
//! let store = MemoryManifestStore::new();
//! let mut collector = HashCollector::new("/about");
//! collector
//!     .collect(CollectKind::Script, "sha256-qznLcsROx4GACP2dm0UCKCzCG+HiZ1guq6ZZDob/Tng=")
//!     .unwrap();
//! let manifest = collector.flush(&store, DEFAULT_LOCK_TIMEOUT).unwrap();
//!
//! // Serve it with a hash-based strict policy.
//! let finalized = StrictCspPolicy::new()
//!     .finalize(
//!         CspBuilder::from_header_value("object-src 'none'"),
//!         RenderMode::Static,
//!         Some(&manifest),
//!         ClientCapabilities::modern(),
//!     )
//!     .unwrap();
//!
//! let (name, value) = finalized.to_header_key_value();
//! assert_eq!(name, CSP_HEADER);
//! assert_eq!(
//!     value,
//!     "object-src 'none'; script-src 'strict-dynamic' https: 'unsafe-inline' \
//!      'sha256-qznLcsROx4GACP2dm0UCKCzCG+HiZ1guq6ZZDob/Tng=';"
//! );
//! ```

pub mod error;
pub mod strict;

pub use error::{Result, StrictCspError};
pub use strict::{ClientCapabilities, FinalizedCsp, RenderMode, StrictCspPolicy, StrictStrategy};

// Re-export the component crates
pub use strictcsp_core;
pub use strictcsp_manifest;

#[cfg(feature = "config")]
pub use strictcsp_config;

pub use strictcsp_core::{
    CSP_HEADER, CSP_HEADER_REPORT_ONLY, CryptoError, CryptoProvider, Csp, CspBuilder, CspCrypto,
    DirectiveName, DirectivePatterns, DirectiveValue, Directives, HashAlgorithm, MergeMode,
    StrictDynamicOptions, StrictSources, ValueMatcher, ValuePattern,
};
pub use strictcsp_manifest::{
    CollectKind, CollectorState, CspManifest, DEFAULT_LOCK_TIMEOUT, FileManifestStore,
    HashCollector, ManifestCache, ManifestError, ManifestStore, MemoryManifestStore,
    NonceTransform, RenderTransform, ScriptDescriptor, ScriptEntry, StyleDescriptor,
};

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        CSP_HEADER, CSP_HEADER_REPORT_ONLY, ClientCapabilities, CollectKind, CryptoProvider,
        CspBuilder, CspCrypto, CspManifest, DEFAULT_LOCK_TIMEOUT, DirectivePatterns, Directives,
        FileManifestStore, FinalizedCsp, HashCollector, ManifestCache, ManifestStore, MergeMode,
        MemoryManifestStore, NonceTransform, RenderMode, RenderTransform, ScriptDescriptor,
        StrictCspError, StrictCspPolicy, StrictStrategy, StyleDescriptor,
    };

    #[cfg(feature = "config")]
    pub use strictcsp_config::{StrictCspConfig, StyleHashing};
}
