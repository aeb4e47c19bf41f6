//! Chainable policy builder.
//!
//! [`CspBuilder`] wraps a [`Csp`] and exposes the directive algebra plus the
//! strict-policy operations (`strict-dynamic` with hashes or a nonce, style
//! hashes). Every `with*` method consumes and returns the builder.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

use crate::algebra::{self, DirectivePatterns, MergeMode, ValueMatcher};
use crate::codec;
use crate::directive::{
    CSP_HEADER, CSP_HEADER_REPORT_ONLY, DirectiveName, DirectiveValue, Directives,
};
use crate::token::{self, NONCE_PREFIX, STRICT_DYNAMIC, UNSAFE_HASHES, UNSAFE_INLINE};

/// Characters a nonce may use: base64 and base64url.
static NONCE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z0-9+/_-]+={0,2}$").expect("valid regex"));

/// Directives that receive the per-request nonce.
const NONCE_DIRECTIVES: [DirectiveName; 3] = [
    DirectiveName::ScriptSrc,
    DirectiveName::StyleSrc,
    DirectiveName::StyleSrcElem,
];

const STYLE_DIRECTIVES: [DirectiveName; 3] = [
    DirectiveName::StyleSrc,
    DirectiveName::StyleSrcElem,
    DirectiveName::StyleSrcAttr,
];

/// A policy and its enforcement mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Csp {
    /// Directive mapping; deserializes from a map or a raw header string
    #[serde(deserialize_with = "directives_or_header")]
    pub directives: Directives,

    /// Report violations without enforcing
    #[serde(default, alias = "reportOnly")]
    pub report_only: bool,
}

fn directives_or_header<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Directives, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Input {
        Header(String),
        Map(Directives),
    }

    Ok(match Input::deserialize(deserializer)? {
        Input::Header(raw) => codec::parse(&raw),
        Input::Map(directives) => {
            algebra::extend(&Directives::new(), &directives, MergeMode::Override)
        }
    })
}

/// Trust anchors for [`CspBuilder::with_strict_dynamic`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StrictSources {
    /// Hashes of inline scripts known ahead of time
    Hashes(Vec<String>),
    /// Per-request nonce (without the `nonce-` prefix)
    Nonce(String),
}

impl From<Vec<String>> for StrictSources {
    fn from(hashes: Vec<String>) -> Self {
        StrictSources::Hashes(hashes)
    }
}

impl From<Vec<&str>> for StrictSources {
    fn from(hashes: Vec<&str>) -> Self {
        StrictSources::Hashes(hashes.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for StrictSources {
    fn from(hashes: [&str; N]) -> Self {
        StrictSources::Hashes(hashes.iter().map(|h| h.to_string()).collect())
    }
}

impl From<&str> for StrictSources {
    fn from(nonce: &str) -> Self {
        StrictSources::Nonce(nonce.to_string())
    }
}

impl From<String> for StrictSources {
    fn from(nonce: String) -> Self {
        StrictSources::Nonce(nonce)
    }
}

/// Options for [`CspBuilder::with_strict_dynamic_options`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictDynamicOptions {
    /// Sources after `'strict-dynamic'` for browsers that ignore it
    pub fallback: Vec<String>,
    /// Append to the existing `script-src` instead of replacing it
    pub extend_script_src: bool,
}

impl Default for StrictDynamicOptions {
    fn default() -> Self {
        Self {
            fallback: vec!["https:".to_string(), UNSAFE_INLINE.to_string()],
            extend_script_src: false,
        }
    }
}

/// Chainable Content Security Policy builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CspBuilder {
    csp: Csp,
}

impl CspBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a raw header value. Unreadable clauses are dropped.
    pub fn from_header_value(content: &str) -> Self {
        Self {
            csp: Csp {
                directives: codec::parse(content),
                report_only: false,
            },
        }
    }

    /// Build from a `(header name, header value)` pair.
    ///
    /// Only the two CSP header names are accepted; anything else yields an
    /// empty builder.
    pub fn from_header_key_value(name: &str, value: &str) -> Self {
        if name.eq_ignore_ascii_case(CSP_HEADER) {
            Self::from_header_value(value)
        } else if name.eq_ignore_ascii_case(CSP_HEADER_REPORT_ONLY) {
            Self::from_header_value(value).with_report_only(true)
        } else {
            Self::new()
        }
    }

    /// Merge directives using [`MergeMode::Append`].
    pub fn with_directives(self, directives: impl Into<Directives>) -> Self {
        self.with_directives_mode(directives, MergeMode::Append)
    }

    /// Merge directives with an explicit mode.
    pub fn with_directives_mode(
        mut self,
        directives: impl Into<Directives>,
        mode: MergeMode,
    ) -> Self {
        self.csp.directives = algebra::extend(&self.csp.directives, &directives.into(), mode);
        self
    }

    /// Merge another builder's directives. The report-only flag of `self` is kept.
    pub fn with_merged(self, other: &CspBuilder, mode: MergeMode) -> Self {
        self.with_directives_mode(other.csp.directives.clone(), mode)
    }

    /// Delete directives outright.
    pub fn without_directives<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.csp.directives.remove(name.as_ref());
        }
        self
    }

    /// Remove matching values from the named directives.
    pub fn without_directive_values(mut self, patterns: &DirectivePatterns) -> Self {
        self.csp.directives = algebra::filter_out(&self.csp.directives, patterns);
        self
    }

    /// Toggle report-only mode
    pub fn with_report_only(mut self, report_only: bool) -> Self {
        self.csp.report_only = report_only;
        self
    }

    /// Whether a directive is in effect.
    pub fn has_directive(&self, name: impl AsRef<str>) -> bool {
        algebra::has(&self.csp.directives, name.as_ref())
    }

    /// Whether any value of a directive matches.
    pub fn has_directive_with_pattern(
        &self,
        name: impl AsRef<str>,
        matcher: impl Into<ValueMatcher>,
    ) -> bool {
        algebra::has_matching(&self.csp.directives, name.as_ref(), &matcher.into())
    }

    /// Replace any nonce in `script-src`, `style-src` and `style-src-elem`.
    ///
    /// Only directives already present are touched; a nonce is never added
    /// to an absent directive. The nonce is swapped in place, so directive
    /// order is unchanged. A nonce with characters outside base64 is
    /// ignored.
    pub fn with_nonce_applied(mut self, nonce: &str) -> Self {
        let nonce = nonce.strip_prefix(NONCE_PREFIX).unwrap_or(nonce);
        if !NONCE_VALUE.is_match(nonce) {
            warn!("Ignoring nonce with characters outside base64");
            return self;
        }

        let source = format!("{}{}", NONCE_PREFIX, nonce);
        for directive in NONCE_DIRECTIVES {
            if let Some(DirectiveValue::Sources(values)) =
                self.csp.directives.entry_mut(directive.as_str())
            {
                values.retain(|v| !token::is_nonce(v));
                values.push(source.clone());
            }
        }
        self
    }

    /// Strict `script-src` with the default fallback (`https: 'unsafe-inline'`).
    pub fn with_strict_dynamic(self, sources: impl Into<StrictSources>) -> Self {
        self.with_strict_dynamic_options(sources, &StrictDynamicOptions::default())
    }

    /// Set `script-src` to `'strict-dynamic' <fallback...> <hashes...>`.
    ///
    /// With a nonce, the nonce is then applied via [`Self::with_nonce_applied`].
    pub fn with_strict_dynamic_options(
        self,
        sources: impl Into<StrictSources>,
        options: &StrictDynamicOptions,
    ) -> Self {
        let sources = sources.into();

        let mut script_src = Vec::with_capacity(1 + options.fallback.len());
        script_src.push(STRICT_DYNAMIC.to_string());
        script_src.extend(options.fallback.iter().cloned());
        if let StrictSources::Hashes(hashes) = &sources {
            script_src.extend(hashes.iter().cloned());
        }

        let mode = if options.extend_script_src {
            MergeMode::Append
        } else {
            MergeMode::Override
        };
        let builder = self.with_directives_mode(
            Directives::new().with(DirectiveName::ScriptSrc, script_src),
            mode,
        );

        match sources {
            StrictSources::Nonce(nonce) => builder.with_nonce_applied(&nonce),
            StrictSources::Hashes(_) => builder,
        }
    }

    /// Write style hashes into `style-src`.
    ///
    /// `'unsafe-hashes'` is added when attribute hashes are present.
    /// `style-src-elem` / `style-src-attr` receive their hashes only if they
    /// already exist. With `remove_unsafe_inline`, `'unsafe-inline'` is
    /// stripped from all three style directives. No hashes is a no-op.
    pub fn with_style_hashes(
        self,
        elem_hashes: &[String],
        attr_hashes: &[String],
        remove_unsafe_inline: bool,
    ) -> Self {
        if elem_hashes.is_empty() && attr_hashes.is_empty() {
            return self;
        }

        let mut combined = Vec::with_capacity(1 + elem_hashes.len() + attr_hashes.len());
        if !attr_hashes.is_empty() {
            combined.push(UNSAFE_HASHES.to_string());
        }
        combined.extend(elem_hashes.iter().cloned());
        combined.extend(attr_hashes.iter().cloned());

        let mut refinements = Directives::new().with(DirectiveName::StyleSrc, combined);
        if !elem_hashes.is_empty() && self.has_directive(DirectiveName::StyleSrcElem) {
            refinements.insert(DirectiveName::StyleSrcElem, elem_hashes);
        }
        if !attr_hashes.is_empty() && self.has_directive(DirectiveName::StyleSrcAttr) {
            let mut attr = vec![UNSAFE_HASHES.to_string()];
            attr.extend(attr_hashes.iter().cloned());
            refinements.insert(DirectiveName::StyleSrcAttr, attr);
        }

        let builder = self.with_directives(refinements);
        if !remove_unsafe_inline {
            return builder;
        }

        let patterns: DirectivePatterns = STYLE_DIRECTIVES
            .iter()
            .map(|d| (d.as_str(), [UNSAFE_INLINE]))
            .collect();
        builder.without_directive_values(&patterns)
    }

    /// Clear all directives and report-only mode.
    pub fn reset(self) -> Self {
        Self::new()
    }

    /// Current policy.
    pub fn csp(&self) -> &Csp {
        &self.csp
    }

    /// Current directive mapping.
    pub fn directives(&self) -> &Directives {
        &self.csp.directives
    }

    pub fn is_report_only(&self) -> bool {
        self.csp.report_only
    }

    /// True iff no directive is set.
    pub fn is_empty(&self) -> bool {
        self.csp.directives.is_empty()
    }

    /// Header name matching the report-only flag.
    pub fn header_name(&self) -> &'static str {
        if self.csp.report_only {
            CSP_HEADER_REPORT_ONLY
        } else {
            CSP_HEADER
        }
    }

    /// Serialized header value.
    pub fn to_header_value(&self) -> String {
        codec::serialize(&self.csp.directives)
    }

    /// `(header name, header value)`.
    pub fn to_header_key_value(&self) -> (&'static str, String) {
        (self.header_name(), self.to_header_value())
    }
}

impl From<Csp> for CspBuilder {
    fn from(csp: Csp) -> Self {
        Self::new()
            .with_directives(csp.directives)
            .with_report_only(csp.report_only)
    }
}

impl From<Directives> for CspBuilder {
    fn from(directives: Directives) -> Self {
        Self::new().with_directives(directives)
    }
}

impl From<&str> for CspBuilder {
    fn from(content: &str) -> Self {
        Self::from_header_value(content)
    }
}

impl From<(&str, &str)> for CspBuilder {
    fn from((name, value): (&str, &str)) -> Self {
        Self::from_header_key_value(name, value)
    }
}

impl fmt::Display for CspBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}
