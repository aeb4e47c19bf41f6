//! # Strict CSP Manifest
//!
//! Route-keyed manifests of script and style hashes collected while a page
//! renders, and lock-guarded persistence shared by many workers.
//!
//! ## Features
//!
//! - ✅ **Idempotent collection** - set semantics for every hash list
//! - ✅ **Typed descriptors** - scripts and styles handed over by the renderer
//! - ✅ **Render transforms** - hash-collecting and nonce-stamping transforms
//! - ✅ **Union-merge flush** - read, merge and write under an exclusive lock
//! - ✅ **Bounded wait** - lock timeouts surface as errors, never as lost hashes
//! - ✅ **Explicit cache** - read-through per-route cache with invalidation
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use strictcsp_core::{CryptoProvider, CspCrypto};
//! use strictcsp_manifest::{
//!     DEFAULT_LOCK_TIMEOUT, HashCollector, ManifestStore, MemoryManifestStore, RenderTransform,
//!     ScriptDescriptor,
//! };
//!
//! let store = MemoryManifestStore::new();
//! let crypto: Arc<dyn CspCrypto> = Arc::new(CryptoProvider::new());
//!
//! let mut collector = HashCollector::new("/");
//! let scripts = collector
//!     .transform(crypto)
//!     .transform_scripts(vec![ScriptDescriptor::inline("console.log(1)")])
//!     .unwrap();
//! assert_eq!(scripts.len(), 1);
//!
//! collector.flush(&store, DEFAULT_LOCK_TIMEOUT).unwrap();
//! assert_eq!(store.read("/").unwrap().unwrap().scripts.len(), 1);
//! ```

pub mod cache;
pub mod collector;
pub mod descriptor;
pub mod error;
pub mod file;
pub mod manifest;
pub mod store;

pub use cache::ManifestCache;
pub use collector::{CollectKind, CollectorState, HashCollector, HashingTransform};
pub use descriptor::{NonceTransform, RenderTransform, ScriptDescriptor, StyleDescriptor};
pub use error::{ManifestError, Result};
pub use file::FileManifestStore;
pub use manifest::{CspManifest, ScriptEntry, StyleHashes};
pub use store::{DEFAULT_LOCK_TIMEOUT, ManifestStore, MemoryManifestStore};
