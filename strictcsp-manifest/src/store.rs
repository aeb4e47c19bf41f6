//! Durable manifest storage.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::error::{ManifestError, Result};
use crate::manifest::CspManifest;

/// Default bounded wait for the flush lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Route-addressable manifest storage.
///
/// `write_with_lock` is the only synchronization point between workers: it
/// must read, union-merge and write under mutual exclusion, and must fail
/// with [`ManifestError::LockTimeout`] rather than skip the write.
pub trait ManifestStore: Send + Sync {
    /// Persisted manifest for `route`, if any.
    fn read(&self, route: &str) -> Result<Option<CspManifest>>;

    /// Merge `manifest` into the persisted one and return the result.
    fn write_with_lock(
        &self,
        route: &str,
        manifest: &CspManifest,
        timeout: Duration,
    ) -> Result<CspManifest>;
}

/// In-process store for single-worker deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryManifestStore {
    entries: Mutex<HashMap<String, CspManifest>>,
}

impl MemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of routes with a stored manifest.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl ManifestStore for MemoryManifestStore {
    fn read(&self, route: &str) -> Result<Option<CspManifest>> {
        Ok(self.entries.lock().get(route).cloned())
    }

    fn write_with_lock(
        &self,
        route: &str,
        manifest: &CspManifest,
        timeout: Duration,
    ) -> Result<CspManifest> {
        let mut entries =
            self.entries
                .try_lock_for(timeout)
                .ok_or_else(|| ManifestError::LockTimeout {
                    route: route.to_string(),
                    timeout,
                })?;

        let merged = entries.entry(route.to_string()).or_default();
        merged.merge(manifest);

        debug!(
            route = %route,
            scripts = merged.scripts.len(),
            style_elems = merged.styles.elem.len(),
            style_attrs = merged.styles.attr.len(),
            "Merged manifest in memory"
        );

        Ok(merged.clone())
    }
}
