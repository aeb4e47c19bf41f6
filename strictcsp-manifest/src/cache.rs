//! Process-wide, explicitly owned manifest cache.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::error::Result;
use crate::manifest::CspManifest;
use crate::store::ManifestStore;

/// Read-through cache of persisted manifests, keyed by route.
///
/// Misses are not cached, so a route becomes visible as soon as its first
/// manifest is flushed. Entries stay until [`ManifestCache::invalidate`] or
/// [`ManifestCache::reset`] is called, typically after a rebuild.
pub struct ManifestCache {
    store: Arc<dyn ManifestStore>,
    entries: RwLock<HashMap<String, Arc<CspManifest>>>,
}

impl ManifestCache {
    pub fn new(store: Arc<dyn ManifestStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Manifest for `route`, loading it from the store on first access.
    pub fn get(&self, route: &str) -> Result<Option<Arc<CspManifest>>> {
        if let Some(hit) = self.entries.read().get(route) {
            trace!(route = %route, "Manifest cache hit");
            return Ok(Some(Arc::clone(hit)));
        }

        let Some(manifest) = self.store.read(route)? else {
            return Ok(None);
        };

        let manifest = Arc::new(manifest);
        self.entries
            .write()
            .insert(route.to_string(), Arc::clone(&manifest));
        Ok(Some(manifest))
    }

    /// Drop the cached manifest of one route.
    pub fn invalidate(&self, route: &str) -> bool {
        self.entries.write().remove(route).is_some()
    }

    /// Drop every cached manifest.
    pub fn reset(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<dyn ManifestStore> {
        &self.store
    }
}

impl std::fmt::Debug for ManifestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestCache")
            .field("cached_routes", &self.len())
            .finish_non_exhaustive()
    }
}
