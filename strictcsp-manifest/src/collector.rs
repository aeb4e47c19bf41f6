//! Per-render-pass hash collection.
//!
//! A [`HashCollector`] is created for one route and one render pass, passed
//! by reference through the rendering pipeline, and flushed once at the end.

use std::sync::Arc;
use std::time::Duration;
use strictcsp_core::{CspCrypto, token};
use tracing::{debug, trace};

use crate::descriptor::{RenderTransform, ScriptDescriptor, StyleDescriptor};
use crate::error::{ManifestError, Result};
use crate::manifest::{CspManifest, ScriptEntry};
use crate::store::ManifestStore;

/// Where a collected hash belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectKind {
    Script,
    StyleElem,
    StyleAttr,
}

/// Lifecycle of a collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// Nothing collected yet
    Empty,
    /// Holds hashes not yet flushed
    Collecting,
    /// Everything collected has been persisted
    Flushed,
}

/// Collects script and style hashes for one route.
#[derive(Debug, Clone)]
pub struct HashCollector {
    route: String,
    manifest: CspManifest,
    state: CollectorState,
}

impl HashCollector {
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            manifest: CspManifest::new(),
            state: CollectorState::Empty,
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// Record a hash. Duplicates are ignored; returns whether it was new.
    pub fn collect(&mut self, kind: CollectKind, hash: &str) -> Result<bool> {
        match kind {
            CollectKind::Script => self.collect_script(ScriptEntry::inline(hash)),
            CollectKind::StyleElem => {
                let hash = validated(hash)?;
                Ok(self.record(|m| m.add_style_elem(hash)))
            }
            CollectKind::StyleAttr => {
                let hash = validated(hash)?;
                Ok(self.record(|m| m.add_style_attr(hash)))
            }
        }
    }

    /// Record a script entry, keyed by its hash.
    pub fn collect_script(&mut self, entry: ScriptEntry) -> Result<bool> {
        let hash = validated(&entry.hash)?;
        let entry = ScriptEntry {
            hash,
            src: entry.src,
        };
        Ok(self.record(|m| m.add_script(entry)))
    }

    /// Hash `content` and record it. Returns the hash source.
    pub fn hash_and_collect(
        &mut self,
        crypto: &dyn CspCrypto,
        kind: CollectKind,
        content: &str,
    ) -> Result<String> {
        let hash = crypto.hash(content)?;
        self.collect(kind, &hash)?;
        Ok(hash)
    }

    /// Snapshot of everything collected so far.
    pub fn pull(&self) -> CspManifest {
        self.manifest.clone()
    }

    /// Merge-write the collected hashes into `store`.
    ///
    /// Does nothing unless new hashes were collected since the last flush.
    /// On failure the collector stays in [`CollectorState::Collecting`] so the
    /// caller can retry.
    pub fn flush(&mut self, store: &dyn ManifestStore, timeout: Duration) -> Result<CspManifest> {
        if self.state != CollectorState::Collecting {
            debug!(route = %self.route, state = ?self.state, "Nothing to flush");
            return Ok(self.manifest.clone());
        }

        let merged = store.write_with_lock(&self.route, &self.manifest, timeout)?;
        self.state = CollectorState::Flushed;
        Ok(merged)
    }

    /// Transform that hashes every script and style it sees into this
    /// collector.
    pub fn transform(&mut self, crypto: Arc<dyn CspCrypto>) -> HashingTransform<'_> {
        HashingTransform {
            collector: self,
            crypto,
        }
    }

    fn record(&mut self, insert: impl FnOnce(&mut CspManifest) -> bool) -> bool {
        let inserted = insert(&mut self.manifest);
        if inserted {
            self.state = CollectorState::Collecting;
        }
        inserted
    }
}

fn validated(hash: &str) -> Result<String> {
    let hash = token::unquote(hash.trim());
    if token::is_hash(hash) {
        Ok(hash.to_string())
    } else {
        Err(ManifestError::InvalidHash(hash.to_string()))
    }
}

/// [`RenderTransform`] that records hashes and returns descriptors unchanged.
///
/// Inline scripts and styles are hashed with the configured provider.
/// External scripts contribute the hashes of their `integrity` attribute.
/// An external script without one records nothing and is blocked by the
/// browser, since `'strict-dynamic'` only trusts scripts loaded by an
/// already trusted script. Such pages need `integrity` or the nonce strategy.
pub struct HashingTransform<'a> {
    collector: &'a mut HashCollector,
    crypto: Arc<dyn CspCrypto>,
}

impl RenderTransform for HashingTransform<'_> {
    fn transform_scripts(
        &mut self,
        scripts: Vec<ScriptDescriptor>,
    ) -> Result<Vec<ScriptDescriptor>> {
        for script in &scripts {
            match (&script.src, &script.content, &script.integrity) {
                (None, Some(content), _) => {
                    let hash = self.crypto.hash(content)?;
                    self.collector.collect_script(ScriptEntry::inline(hash))?;
                }
                (Some(src), _, Some(integrity)) => {
                    for hash in integrity.split_whitespace().filter(|h| token::is_hash(h)) {
                        self.collector
                            .collect_script(ScriptEntry::external(src.clone(), hash))?;
                    }
                }
                (Some(src), _, None) => {
                    trace!(src = %src, "External script without integrity, not hashed");
                }
                (None, None, _) => {}
            }
        }
        Ok(scripts)
    }

    fn transform_styles(&mut self, styles: Vec<StyleDescriptor>) -> Result<Vec<StyleDescriptor>> {
        for style in &styles {
            let kind = match style {
                StyleDescriptor::Element { .. } => CollectKind::StyleElem,
                StyleDescriptor::Attribute { .. } => CollectKind::StyleAttr,
            };
            self.collector
                .hash_and_collect(self.crypto.as_ref(), kind, style.content())?;
        }
        Ok(styles)
    }
}
