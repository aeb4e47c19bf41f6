//! Pure operations over directive mappings.
//!
//! None of these functions mutate their inputs. Value order is preserved so
//! the same inputs always serialize to byte-identical headers.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::directive::{DirectiveValue, Directives};
use crate::token;

/// How list values are combined when both sides define a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// `base ++ (addition - base)`
    #[default]
    Append,
    /// `(addition - base) ++ base`
    Prepend,
    /// `addition` replaces `base`
    Override,
}

/// Values to remove from a directive.
#[derive(Debug, Clone)]
pub enum ValuePattern {
    /// Remove values equal to any of these (quotes ignored)
    Values(Vec<String>),
    /// Remove values matching this expression
    Regex(Regex),
}

impl ValuePattern {
    fn removes(&self, value: &str) -> bool {
        match self {
            ValuePattern::Values(values) => values.iter().any(|v| token::unquote(v) == value),
            ValuePattern::Regex(re) => re.is_match(value),
        }
    }
}

impl From<Regex> for ValuePattern {
    fn from(re: Regex) -> Self {
        ValuePattern::Regex(re)
    }
}

impl From<Vec<String>> for ValuePattern {
    fn from(values: Vec<String>) -> Self {
        ValuePattern::Values(values)
    }
}

impl From<Vec<&str>> for ValuePattern {
    fn from(values: Vec<&str>) -> Self {
        ValuePattern::Values(values.into_iter().map(String::from).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ValuePattern {
    fn from(values: [&str; N]) -> Self {
        ValuePattern::Values(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Query used by [`has_matching`].
#[derive(Debug, Clone)]
pub enum ValueMatcher {
    /// Any value containing this substring
    Substring(String),
    /// Any value matching this expression
    Regex(Regex),
}

impl ValueMatcher {
    pub fn is_match(&self, value: &str) -> bool {
        match self {
            ValueMatcher::Substring(needle) => value.contains(token::unquote(needle)),
            ValueMatcher::Regex(re) => re.is_match(value),
        }
    }
}

impl From<&str> for ValueMatcher {
    fn from(needle: &str) -> Self {
        ValueMatcher::Substring(needle.to_string())
    }
}

impl From<String> for ValueMatcher {
    fn from(needle: String) -> Self {
        ValueMatcher::Substring(needle)
    }
}

impl From<Regex> for ValueMatcher {
    fn from(re: Regex) -> Self {
        ValueMatcher::Regex(re)
    }
}

/// Per-directive removal patterns for [`filter_out`].
#[derive(Debug, Clone, Default)]
pub struct DirectivePatterns(IndexMap<String, ValuePattern>);

impl DirectivePatterns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the pattern for a directive.
    pub fn with(mut self, name: impl AsRef<str>, pattern: impl Into<ValuePattern>) -> Self {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), pattern.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ValuePattern> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K, P> FromIterator<(K, P)> for DirectivePatterns
where
    K: AsRef<str>,
    P: Into<ValuePattern>,
{
    fn from_iter<I: IntoIterator<Item = (K, P)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |patterns, (name, pattern)| patterns.with(name, pattern))
    }
}

/// Merge `addition` into `base`.
///
/// - flag vs flag: `addition` wins; `false` removes the directive
/// - list vs list: combined according to `mode`
/// - absent in `base` (or mismatched shapes): `addition` is taken as-is
///
/// Directives only in `base` are carried through. A list directive that
/// ends up empty is removed.
pub fn extend(base: &Directives, addition: &Directives, mode: MergeMode) -> Directives {
    let mut merged = base.clone();

    for (name, value) in addition.iter() {
        let next = match (merged.get(name), value) {
            (_, DirectiveValue::Flag(flag)) => DirectiveValue::Flag(*flag),
            (Some(DirectiveValue::Sources(current)), DirectiveValue::Sources(added)) => {
                DirectiveValue::Sources(merge_lists(current, added, mode))
            }
            (_, DirectiveValue::Sources(added)) => DirectiveValue::Sources(added.clone()),
        };

        if next.is_active() {
            merged.insert_raw(name.to_string(), next);
        } else {
            merged.remove_raw(name);
        }
    }

    merged
}

fn merge_lists(current: &[String], added: &[String], mode: MergeMode) -> Vec<String> {
    let fresh = added.iter().filter(|v| !current.contains(v)).cloned();

    match mode {
        MergeMode::Append => current.iter().cloned().chain(fresh).collect(),
        MergeMode::Prepend => fresh.chain(current.iter().cloned()).collect(),
        MergeMode::Override => added.to_vec(),
    }
}

/// Remove values matching `patterns` from the directives they name.
///
/// Flag directives are never filtered. A list directive whose values are all
/// removed is dropped from the mapping.
pub fn filter_out(directives: &Directives, patterns: &DirectivePatterns) -> Directives {
    let mut filtered = directives.clone();

    for (name, value) in directives.iter() {
        let (Some(pattern), DirectiveValue::Sources(_)) = (patterns.get(name), value) else {
            continue;
        };

        let mut emptied = false;
        if let Some(DirectiveValue::Sources(values)) = filtered.entry_mut(name) {
            values.retain(|v| !pattern.removes(v));
            emptied = values.is_empty();
        }
        if emptied {
            filtered.remove_raw(name);
        }
    }

    filtered
}

/// Whether a directive is in effect: a set flag or a non-empty list.
pub fn has(directives: &Directives, name: &str) -> bool {
    directives
        .get(name)
        .map(DirectiveValue::is_active)
        .unwrap_or(false)
}

/// Whether any value of a list directive matches `matcher`.
pub fn has_matching(directives: &Directives, name: &str, matcher: &ValueMatcher) -> bool {
    directives
        .sources(name)
        .map(|values| values.iter().any(|v| matcher.is_match(v)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_extend_append() {
        let base = Directives::new().with("script-src", ["self", "https:"]);
        let addition = Directives::new().with("script-src", ["https:", "example.com"]);

        let merged = extend(&base, &addition, MergeMode::Append);
        assert_eq!(
            merged.sources("script-src").unwrap(),
            strings(&["self", "https:", "example.com"])
        );
    }

    #[test]
    fn test_extend_prepend() {
        let base = Directives::new().with("script-src", ["self", "https:"]);
        let addition = Directives::new().with("script-src", ["https:", "example.com"]);

        let merged = extend(&base, &addition, MergeMode::Prepend);
        assert_eq!(
            merged.sources("script-src").unwrap(),
            strings(&["example.com", "self", "https:"])
        );
    }

    #[test]
    fn test_extend_override() {
        let base = Directives::new()
            .with("script-src", ["self", "https:"])
            .with("img-src", ["data:"]);
        let addition = Directives::new().with("script-src", ["example.com"]);

        let merged = extend(&base, &addition, MergeMode::Override);
        assert_eq!(merged.sources("script-src").unwrap(), strings(&["example.com"]));
        assert_eq!(merged.sources("img-src").unwrap(), strings(&["data:"]));
    }

    #[test]
    fn test_extend_does_not_mutate_inputs() {
        let base = Directives::new().with("script-src", ["self"]);
        let addition = Directives::new().with("style-src", ["self"]);
        let _ = extend(&base, &addition, MergeMode::Append);

        assert_eq!(base.len(), 1);
        assert_eq!(addition.len(), 1);
    }

    #[test]
    fn test_extend_flags() {
        let base = Directives::new()
            .with("block-all-mixed-content", true)
            .with("script-src", ["self"]);
        let addition = Directives::new()
            .with("sandbox", true)
            .with("upgrade-insecure-requests", true);

        let merged = extend(&base, &addition, MergeMode::Override);
        assert!(has(&merged, "sandbox"));
        assert!(has(&merged, "upgrade-insecure-requests"));
        assert!(has(&merged, "block-all-mixed-content"));

        let removal = Directives::new().with("block-all-mixed-content", false);
        let merged = extend(&merged, &removal, MergeMode::Append);
        assert!(!merged.contains_key("block-all-mixed-content"));
    }

    #[test]
    fn test_filter_out_values_and_regex() {
        let directives = Directives::new()
            .with("script-src", ["self", "unsafe-inline", "https://a.example.com"])
            .with("style-src", ["self", "unsafe-inline"])
            .with("sandbox", true);

        let patterns = DirectivePatterns::new()
            .with("script-src", Regex::new(r"example\.com").unwrap())
            .with("style-src", ["'unsafe-inline'"])
            .with("sandbox", ["anything"]);

        let filtered = filter_out(&directives, &patterns);
        assert_eq!(
            filtered.sources("script-src").unwrap(),
            strings(&["self", "unsafe-inline"])
        );
        assert_eq!(filtered.sources("style-src").unwrap(), strings(&["self"]));
        assert!(has(&filtered, "sandbox"));
    }

    #[test]
    fn test_filter_out_drops_emptied_directive() {
        let directives = Directives::new().with("script-src", ["unsafe-inline"]);
        let patterns = DirectivePatterns::new().with("script-src", ["unsafe-inline"]);

        let filtered = filter_out(&directives, &patterns);
        assert!(!has(&filtered, "script-src"));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_has_matching() {
        let directives = Directives::new().with("script-src", ["self", "nonce-abc"]);

        assert!(has_matching(&directives, "script-src", &"nonce-".into()));
        assert!(has_matching(
            &directives,
            "script-src",
            &Regex::new("^nonce-[a-z]+$").unwrap().into()
        ));
        assert!(!has_matching(&directives, "script-src", &"sha256".into()));
        assert!(!has_matching(&directives, "style-src", &"self".into()));
    }
}
