//! Strict-policy derivation.
//!
//! Combines the router's classification of a request, the client's
//! capabilities and the route's hash manifest into a finalized
//! [`CspBuilder`]. Statically rendered routes with a known manifest are
//! trusted by hash; everything else gets a fresh per-request nonce.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strictcsp_core::token::STRICT_DYNAMIC;
use strictcsp_core::{
    CryptoProvider, CspBuilder, CspCrypto, DirectiveName, DirectivePatterns, StrictDynamicOptions,
};
use strictcsp_manifest::{CspManifest, ManifestCache};
use tracing::debug;

use crate::error::Result;

/// How the router renders a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Prerendered; script bodies are known ahead of the request.
    Static,
    /// Rendered per request.
    Dynamic,
}

/// What the requesting browser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    pub supports_strict_dynamic: bool,
    pub supports_hashes: bool,
}

impl ClientCapabilities {
    /// A CSP Level 3 browser.
    pub fn modern() -> Self {
        Self {
            supports_strict_dynamic: true,
            supports_hashes: true,
        }
    }

    /// A browser that understands neither `'strict-dynamic'` nor hashes.
    pub fn legacy() -> Self {
        Self {
            supports_strict_dynamic: false,
            supports_hashes: false,
        }
    }

    pub fn with_strict_dynamic(mut self, supported: bool) -> Self {
        self.supports_strict_dynamic = supported;
        self
    }

    pub fn with_hashes(mut self, supported: bool) -> Self {
        self.supports_hashes = supported;
        self
    }
}

impl Default for ClientCapabilities {
    fn default() -> Self {
        Self::modern()
    }
}

/// Which strict-CSP strategy a finalized policy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrictStrategy {
    Hashes,
    Nonce,
}

/// Result of [`StrictCspPolicy::finalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedCsp {
    pub builder: CspBuilder,
    /// Nonce to stamp on every script and `<style>` element. Set only for
    /// the nonce strategy.
    pub nonce: Option<String>,
    pub strategy: StrictStrategy,
}

impl FinalizedCsp {
    pub fn to_header_key_value(&self) -> (&'static str, String) {
        self.builder.to_header_key_value()
    }
}

/// Derives strict policies for individual requests.
///
/// # Examples
///
/// ```
/// use strictcsp::{ClientCapabilities, RenderMode, StrictCspPolicy, StrictStrategy};
/// use strictcsp::CspBuilder;
///
/// let policy = StrictCspPolicy::new();
/// let base = CspBuilder::from_header_value("default-src 'self'");
///
/// let finalized = policy
///     .finalize(base, RenderMode::Dynamic, None, ClientCapabilities::modern())
///     .unwrap();
///
/// assert_eq!(finalized.strategy, StrictStrategy::Nonce);
/// let nonce = finalized.nonce.as_deref().unwrap();
/// assert!(finalized.builder.to_header_value().contains(&format!("'nonce-{}'", nonce)));
/// ```
#[derive(Clone)]
pub struct StrictCspPolicy {
    crypto: Arc<dyn CspCrypto>,
    options: StrictDynamicOptions,
    hash_styles: bool,
    remove_unsafe_inline: bool,
}

impl StrictCspPolicy {
    /// Policy with the default crypto provider, fallback and style hashing.
    pub fn new() -> Self {
        Self {
            crypto: Arc::new(CryptoProvider::new()),
            options: StrictDynamicOptions::default(),
            hash_styles: true,
            remove_unsafe_inline: true,
        }
    }

    pub fn with_crypto(mut self, crypto: Arc<dyn CspCrypto>) -> Self {
        self.crypto = crypto;
        self
    }

    pub fn with_options(mut self, options: StrictDynamicOptions) -> Self {
        self.options = options;
        self
    }

    /// Write manifest style hashes into `style-src`, optionally dropping
    /// `'unsafe-inline'` from the style directives.
    pub fn with_style_hashing(mut self, enabled: bool, remove_unsafe_inline: bool) -> Self {
        self.hash_styles = enabled;
        self.remove_unsafe_inline = remove_unsafe_inline;
        self
    }

    pub fn crypto(&self) -> &Arc<dyn CspCrypto> {
        &self.crypto
    }

    pub fn options(&self) -> &StrictDynamicOptions {
        &self.options
    }

    /// Strategy [`Self::finalize`] would pick.
    ///
    /// Hashes need at least one script hash; a manifest with only style
    /// hashes would leave inline scripts unauthorized.
    pub fn strategy(
        &self,
        mode: RenderMode,
        manifest: Option<&CspManifest>,
        capabilities: ClientCapabilities,
    ) -> StrictStrategy {
        match (mode, manifest) {
            (RenderMode::Static, Some(manifest))
                if capabilities.supports_hashes && !manifest.scripts.is_empty() =>
            {
                StrictStrategy::Hashes
            }
            _ => StrictStrategy::Nonce,
        }
    }

    /// Apply the strict strategy for one request on top of `base`.
    ///
    /// Without `'strict-dynamic'` support the keyword is dropped, leaving
    /// the fallback sources and the hash or nonce tokens.
    pub fn finalize(
        &self,
        base: CspBuilder,
        mode: RenderMode,
        manifest: Option<&CspManifest>,
        capabilities: ClientCapabilities,
    ) -> Result<FinalizedCsp> {
        let strategy = self.strategy(mode, manifest, capabilities);
        debug!(?mode, ?strategy, ?capabilities, "Selected strict CSP strategy");

        let (builder, nonce) = match (strategy, manifest) {
            (StrictStrategy::Hashes, Some(manifest)) => {
                let builder =
                    base.with_strict_dynamic_options(manifest.script_hashes(), &self.options);
                let builder = if self.hash_styles {
                    builder.with_style_hashes(
                        &manifest.styles.elem,
                        &manifest.styles.attr,
                        self.remove_unsafe_inline,
                    )
                } else {
                    builder
                };
                (builder, None)
            }
            _ => {
                let nonce = self.crypto.nonce()?;
                let builder = base.with_strict_dynamic_options(nonce.as_str(), &self.options);
                (builder, Some(nonce))
            }
        };

        let builder = if capabilities.supports_strict_dynamic {
            builder
        } else {
            builder.without_directive_values(
                &DirectivePatterns::new().with(DirectiveName::ScriptSrc, [STRICT_DYNAMIC]),
            )
        };

        Ok(FinalizedCsp {
            builder,
            nonce,
            strategy,
        })
    }

    /// [`Self::finalize`] with the manifest of `route` looked up in `cache`.
    ///
    /// Dynamic routes never touch the cache.
    pub fn finalize_route(
        &self,
        base: CspBuilder,
        route: &str,
        mode: RenderMode,
        cache: &ManifestCache,
        capabilities: ClientCapabilities,
    ) -> Result<FinalizedCsp> {
        let manifest = match mode {
            RenderMode::Static if capabilities.supports_hashes => cache.get(route)?,
            _ => None,
        };
        self.finalize(base, mode, manifest.as_deref(), capabilities)
    }
}

impl Default for StrictCspPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StrictCspPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrictCspPolicy")
            .field("algorithm", &self.crypto.algorithm())
            .field("options", &self.options)
            .field("hash_styles", &self.hash_styles)
            .field("remove_unsafe_inline", &self.remove_unsafe_inline)
            .finish()
    }
}

#[cfg(feature = "config")]
impl From<&strictcsp_config::StrictCspConfig> for StrictCspPolicy {
    fn from(config: &strictcsp_config::StrictCspConfig) -> Self {
        Self::new()
            .with_crypto(Arc::new(config.crypto_provider()))
            .with_options(config.strict_dynamic_options())
            .with_style_hashing(
                config.styles.is_enabled(),
                config.styles.removes_unsafe_inline(),
            )
    }
}
