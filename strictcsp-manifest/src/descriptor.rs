//! Typed script and style descriptors exchanged with the page renderer.
//!
//! The host renders a page, hands the scripts and styles it is about to emit
//! to a [`RenderTransform`], and emits whatever comes back. This is the only
//! seam between rendering and policy derivation.

use crate::error::Result;

/// A `<script>` the page will load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptDescriptor {
    /// `src` attribute of an external script.
    pub src: Option<String>,
    /// Body of an inline script, byte-exact.
    pub content: Option<String>,
    /// `integrity` attribute, possibly several space-separated hashes.
    pub integrity: Option<String>,
    /// `nonce` attribute to emit.
    pub nonce: Option<String>,
}

impl ScriptDescriptor {
    /// Inline script with the given body.
    pub fn inline(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// External script loaded from `src`.
    pub fn external(src: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            ..Default::default()
        }
    }

    /// Set the `integrity` attribute.
    pub fn with_integrity(mut self, integrity: impl Into<String>) -> Self {
        self.integrity = Some(integrity.into());
        self
    }

    /// Set the `nonce` attribute.
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn is_inline(&self) -> bool {
        self.src.is_none()
    }
}

/// A style the page will apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleDescriptor {
    /// `<style>` element body and its nonce attribute.
    Element {
        content: String,
        nonce: Option<String>,
    },
    /// Value of a `style="..."` attribute. Attributes cannot carry nonces.
    Attribute { content: String },
}

impl StyleDescriptor {
    pub fn element(content: impl Into<String>) -> Self {
        StyleDescriptor::Element {
            content: content.into(),
            nonce: None,
        }
    }

    pub fn attribute(content: impl Into<String>) -> Self {
        StyleDescriptor::Attribute {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            StyleDescriptor::Element { content, .. } | StyleDescriptor::Attribute { content } => {
                content
            }
        }
    }
}

/// Extension point the host's rendering pipeline calls before emitting
/// scripts and styles.
pub trait RenderTransform {
    /// Inspect or rewrite the scripts of a page.
    fn transform_scripts(
        &mut self,
        scripts: Vec<ScriptDescriptor>,
    ) -> Result<Vec<ScriptDescriptor>> {
        Ok(scripts)
    }

    /// Inspect or rewrite the styles of a page.
    fn transform_styles(&mut self, styles: Vec<StyleDescriptor>) -> Result<Vec<StyleDescriptor>> {
        Ok(styles)
    }
}

/// Stamps a per-request nonce on every script and `<style>` element.
#[derive(Debug, Clone)]
pub struct NonceTransform {
    nonce: String,
}

impl NonceTransform {
    pub fn new(nonce: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
        }
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

impl RenderTransform for NonceTransform {
    fn transform_scripts(
        &mut self,
        scripts: Vec<ScriptDescriptor>,
    ) -> Result<Vec<ScriptDescriptor>> {
        Ok(scripts
            .into_iter()
            .map(|s| s.with_nonce(self.nonce.clone()))
            .collect())
    }

    fn transform_styles(&mut self, styles: Vec<StyleDescriptor>) -> Result<Vec<StyleDescriptor>> {
        Ok(styles
            .into_iter()
            .map(|style| match style {
                StyleDescriptor::Element { content, .. } => StyleDescriptor::Element {
                    content,
                    nonce: Some(self.nonce.clone()),
                },
                attr @ StyleDescriptor::Attribute { .. } => attr,
            })
            .collect())
    }
}
