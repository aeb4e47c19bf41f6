//! Typed Content Security Policy model.
//!
//! A policy is an ordered mapping from directive name to either a flag
//! (`upgrade-insecure-requests`) or an ordered set of source tokens
//! (`script-src 'self' https:`). Tokens are stored unquoted; quoting is a
//! serialization concern handled by [`crate::token`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use tracing::trace;

use crate::token;

/// Header name for an enforced policy.
pub const CSP_HEADER: &str = "content-security-policy";

/// Header name for a report-only policy.
pub const CSP_HEADER_REPORT_ONLY: &str = "content-security-policy-report-only";

/// Whether a directive carries a value list or is a bare flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    /// Presence-only directive, e.g. `upgrade-insecure-requests`
    Boolean,
    /// Directive followed by source expressions, e.g. `script-src`
    List,
}

/// Known CSP directive identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveName {
    DefaultSrc,
    ScriptSrc,
    ScriptSrcElem,
    ScriptSrcAttr,
    StyleSrc,
    StyleSrcElem,
    StyleSrcAttr,
    ImgSrc,
    FontSrc,
    ConnectSrc,
    MediaSrc,
    ObjectSrc,
    FrameSrc,
    ChildSrc,
    WorkerSrc,
    ManifestSrc,
    PrefetchSrc,
    BaseUri,
    FormAction,
    FrameAncestors,
    NavigateTo,
    ReportUri,
    ReportTo,
    Sandbox,
    PluginTypes,
    RequireTrustedTypesFor,
    TrustedTypes,
    RequireSriFor,
    UpgradeInsecureRequests,
    BlockAllMixedContent,
}

impl DirectiveName {
    /// Every known directive, in declaration order.
    pub const ALL: [DirectiveName; 30] = [
        DirectiveName::DefaultSrc,
        DirectiveName::ScriptSrc,
        DirectiveName::ScriptSrcElem,
        DirectiveName::ScriptSrcAttr,
        DirectiveName::StyleSrc,
        DirectiveName::StyleSrcElem,
        DirectiveName::StyleSrcAttr,
        DirectiveName::ImgSrc,
        DirectiveName::FontSrc,
        DirectiveName::ConnectSrc,
        DirectiveName::MediaSrc,
        DirectiveName::ObjectSrc,
        DirectiveName::FrameSrc,
        DirectiveName::ChildSrc,
        DirectiveName::WorkerSrc,
        DirectiveName::ManifestSrc,
        DirectiveName::PrefetchSrc,
        DirectiveName::BaseUri,
        DirectiveName::FormAction,
        DirectiveName::FrameAncestors,
        DirectiveName::NavigateTo,
        DirectiveName::ReportUri,
        DirectiveName::ReportTo,
        DirectiveName::Sandbox,
        DirectiveName::PluginTypes,
        DirectiveName::RequireTrustedTypesFor,
        DirectiveName::TrustedTypes,
        DirectiveName::RequireSriFor,
        DirectiveName::UpgradeInsecureRequests,
        DirectiveName::BlockAllMixedContent,
    ];

    /// Wire name of the directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            DirectiveName::DefaultSrc => "default-src",
            DirectiveName::ScriptSrc => "script-src",
            DirectiveName::ScriptSrcElem => "script-src-elem",
            DirectiveName::ScriptSrcAttr => "script-src-attr",
            DirectiveName::StyleSrc => "style-src",
            DirectiveName::StyleSrcElem => "style-src-elem",
            DirectiveName::StyleSrcAttr => "style-src-attr",
            DirectiveName::ImgSrc => "img-src",
            DirectiveName::FontSrc => "font-src",
            DirectiveName::ConnectSrc => "connect-src",
            DirectiveName::MediaSrc => "media-src",
            DirectiveName::ObjectSrc => "object-src",
            DirectiveName::FrameSrc => "frame-src",
            DirectiveName::ChildSrc => "child-src",
            DirectiveName::WorkerSrc => "worker-src",
            DirectiveName::ManifestSrc => "manifest-src",
            DirectiveName::PrefetchSrc => "prefetch-src",
            DirectiveName::BaseUri => "base-uri",
            DirectiveName::FormAction => "form-action",
            DirectiveName::FrameAncestors => "frame-ancestors",
            DirectiveName::NavigateTo => "navigate-to",
            DirectiveName::ReportUri => "report-uri",
            DirectiveName::ReportTo => "report-to",
            DirectiveName::Sandbox => "sandbox",
            DirectiveName::PluginTypes => "plugin-types",
            DirectiveName::RequireTrustedTypesFor => "require-trusted-types-for",
            DirectiveName::TrustedTypes => "trusted-types",
            DirectiveName::RequireSriFor => "require-sri-for",
            DirectiveName::UpgradeInsecureRequests => "upgrade-insecure-requests",
            DirectiveName::BlockAllMixedContent => "block-all-mixed-content",
        }
    }

    /// Look up a known directive by its (case-insensitive) wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(name))
    }

    /// Value shape of this directive.
    pub fn kind(&self) -> DirectiveKind {
        match self {
            DirectiveName::Sandbox
            | DirectiveName::UpgradeInsecureRequests
            | DirectiveName::BlockAllMixedContent => DirectiveKind::Boolean,
            _ => DirectiveKind::List,
        }
    }
}

impl fmt::Display for DirectiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for DirectiveName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Classify an arbitrary directive name. Unknown names are list-valued.
pub fn directive_kind(name: &str) -> DirectiveKind {
    DirectiveName::from_name(name)
        .map(|d| d.kind())
        .unwrap_or(DirectiveKind::List)
}

/// Value held by a single directive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DirectiveValue {
    /// Flag directive; `false` means "remove this directive" when merged
    Flag(bool),
    /// Ordered, de-duplicated source tokens (unquoted)
    Sources(Vec<String>),
}

impl DirectiveValue {
    /// Source tokens, if this is a list value.
    pub fn sources(&self) -> Option<&[String]> {
        match self {
            DirectiveValue::Sources(values) => Some(values),
            DirectiveValue::Flag(_) => None,
        }
    }

    /// Whether the directive is in effect: a set flag or a non-empty list.
    pub fn is_active(&self) -> bool {
        match self {
            DirectiveValue::Flag(flag) => *flag,
            DirectiveValue::Sources(values) => !values.is_empty(),
        }
    }

    /// Split values into single tokens, unquote them, drop blanks, and
    /// remove duplicates keeping the first.
    ///
    /// A value containing a clause (`;`) or policy (`,`) separator is
    /// dropped whole, so no value can smuggle extra directives into the
    /// header.
    pub(crate) fn normalized(self) -> Self {
        match self {
            DirectiveValue::Flag(flag) => DirectiveValue::Flag(flag),
            DirectiveValue::Sources(values) => {
                let mut out: Vec<String> = Vec::with_capacity(values.len());
                for value in &values {
                    if value.contains([';', ',']) {
                        trace!(value = %value, "dropping source with a separator");
                        continue;
                    }
                    for part in value.split_whitespace() {
                        let part = token::unquote(part);
                        if !part.is_empty() && !out.iter().any(|v| v == part) {
                            out.push(part.to_string());
                        }
                    }
                }
                DirectiveValue::Sources(out)
            }
        }
    }
}

impl From<bool> for DirectiveValue {
    fn from(flag: bool) -> Self {
        DirectiveValue::Flag(flag)
    }
}

impl From<Vec<String>> for DirectiveValue {
    fn from(values: Vec<String>) -> Self {
        DirectiveValue::Sources(values)
    }
}

impl From<Vec<&str>> for DirectiveValue {
    fn from(values: Vec<&str>) -> Self {
        DirectiveValue::Sources(values.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for DirectiveValue {
    fn from(values: [&str; N]) -> Self {
        DirectiveValue::Sources(values.iter().map(|v| v.to_string()).collect())
    }
}

impl From<&[String]> for DirectiveValue {
    fn from(values: &[String]) -> Self {
        DirectiveValue::Sources(values.to_vec())
    }
}

/// Ordered directive mapping.
///
/// Names are lower-cased and values normalized on insertion. Equality is
/// map equality: directive order is ignored, value order is not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "IndexMap<String, DirectiveValue>")]
pub struct Directives(IndexMap<String, DirectiveValue>);

impl Directives {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw header value. See [`crate::codec::parse`].
    pub fn parse(content: &str) -> Self {
        crate::codec::parse(content)
    }

    /// Insert a directive, replacing any existing value.
    ///
    /// A `Flag(false)` entry is kept; it only has meaning as a merge
    /// instruction, where it removes the directive from the base. A list
    /// left empty after normalization removes the directive.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<DirectiveValue>) {
        let name = name.as_ref().trim().to_ascii_lowercase();
        if name.is_empty() {
            return;
        }
        match value.into().normalized() {
            DirectiveValue::Sources(values) if values.is_empty() => {
                self.0.shift_remove(&name);
            }
            value => {
                self.0.insert(name, value);
            }
        }
    }

    /// Builder-style [`Directives::insert`].
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<DirectiveValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Remove a directive, preserving the order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<DirectiveValue> {
        self.0.shift_remove(&name.to_ascii_lowercase())
    }

    /// Value of a directive.
    pub fn get(&self, name: &str) -> Option<&DirectiveValue> {
        self.0.get(&name.to_ascii_lowercase())
    }

    /// Source tokens of a list directive.
    pub fn sources(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(DirectiveValue::sources)
    }

    /// Whether the key exists at all, regardless of its value.
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    /// Directive names in mapping order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in mapping order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DirectiveValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn entry_mut(&mut self, name: &str) -> Option<&mut DirectiveValue> {
        self.0.get_mut(name)
    }

    pub(crate) fn insert_raw(&mut self, name: String, value: DirectiveValue) {
        self.0.insert(name, value);
    }

    pub(crate) fn remove_raw(&mut self, name: &str) {
        self.0.shift_remove(name);
    }
}

impl Serialize for Directives {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl From<IndexMap<String, DirectiveValue>> for Directives {
    fn from(map: IndexMap<String, DirectiveValue>) -> Self {
        map.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Directives
where
    K: AsRef<str>,
    V: Into<DirectiveValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut directives = Directives::new();
        for (name, value) in iter {
            directives.insert(name, value);
        }
        directives
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Directives
where
    K: AsRef<str>,
    V: Into<DirectiveValue>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl From<&str> for Directives {
    fn from(content: &str) -> Self {
        crate::codec::parse(content)
    }
}

impl From<String> for Directives {
    fn from(content: String) -> Self {
        crate::codec::parse(&content)
    }
}

impl fmt::Display for Directives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::codec::serialize(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_name_lookup() {
        assert_eq!(
            DirectiveName::from_name("Script-Src"),
            Some(DirectiveName::ScriptSrc)
        );
        assert_eq!(DirectiveName::from_name("x-future-src"), None);
        assert_eq!(DirectiveName::Sandbox.kind(), DirectiveKind::Boolean);
        assert_eq!(directive_kind("x-future-src"), DirectiveKind::List);
    }

    #[test]
    fn test_insert_normalizes_values() {
        let mut directives = Directives::new();
        directives.insert("SCRIPT-SRC", vec!["'self'", "self", " https: ", ""]);

        assert_eq!(
            directives.sources("script-src"),
            Some(&["self".to_string(), "https:".to_string()][..])
        );
    }

    #[test]
    fn test_insert_drops_values_with_separators() {
        let directives = Directives::new()
            .with("script-src", ["'self'; script-src *", "https:"])
            .with("img-src", ["data: blob:"])
            .with("object-src", ["'none', default-src *"]);

        assert_eq!(
            directives.sources("script-src"),
            Some(&["https:".to_string()][..])
        );
        assert_eq!(
            directives.sources("img-src"),
            Some(&["data:".to_string(), "blob:".to_string()][..])
        );
        assert!(!directives.contains_key("object-src"));
        assert_eq!(
            crate::codec::parse(&crate::codec::serialize(&directives)),
            directives
        );
    }

    #[test]
    fn test_flag_entries() {
        let directives = Directives::from([("block-all-mixed-content", true), ("sandbox", false)]);

        assert!(directives.get("block-all-mixed-content").unwrap().is_active());
        assert!(!directives.get("sandbox").unwrap().is_active());
    }

    #[test]
    fn test_equality_ignores_directive_order() {
        let a = Directives::new()
            .with("script-src", ["self"])
            .with("img-src", ["data:"]);
        let b = Directives::new()
            .with("img-src", ["data:"])
            .with("script-src", ["self"]);
        assert_eq!(a, b);

        let c = Directives::new().with("script-src", ["https:", "self"]);
        let d = Directives::new().with("script-src", ["self", "https:"]);
        assert_ne!(c, d);
    }

    #[test]
    fn test_deserialize_from_json() {
        let directives: Directives = serde_json::from_str(
            r#"{"script-src": ["'self'", "https:"], "upgrade-insecure-requests": true}"#,
        )
        .unwrap();

        assert_eq!(
            directives.get("upgrade-insecure-requests"),
            Some(&DirectiveValue::Flag(true))
        );
        assert_eq!(
            directives.sources("script-src"),
            Some(&["self".to_string(), "https:".to_string()][..])
        );
    }
}
