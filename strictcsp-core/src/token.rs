//! Source token classification and quoting.

use std::borrow::Cow;

use crate::crypto::HashAlgorithm;

/// Keyword sources that must be single-quoted on the wire.
pub const KEYWORDS: &[&str] = &[
    "self",
    "none",
    "unsafe-inline",
    "unsafe-eval",
    "unsafe-hashes",
    "strict-dynamic",
    "report-sample",
    "wasm-unsafe-eval",
    "unsafe-allow-redirects",
    "inline-speculation-rules",
    // Trusted Types
    "script",
    "allow-duplicates",
];

pub const STRICT_DYNAMIC: &str = "strict-dynamic";
pub const UNSAFE_INLINE: &str = "unsafe-inline";
pub const UNSAFE_HASHES: &str = "unsafe-hashes";
pub const NONCE_PREFIX: &str = "nonce-";

/// Classification of an (unquoted) source token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `'self'`, `'none'`, `'strict-dynamic'`, ...
    Keyword,
    /// `'nonce-<base64>'`
    Nonce,
    /// `'<algorithm>-<base64digest>'`
    Hash(HashAlgorithm),
    /// Scheme, host pattern or URL path
    Raw,
}

impl SourceKind {
    /// Whether tokens of this kind are single-quoted when serialized.
    pub fn is_quoted(&self) -> bool {
        !matches!(self, SourceKind::Raw)
    }
}

/// Classify a token. Surrounding single quotes are ignored.
pub fn classify(token: &str) -> SourceKind {
    let token = unquote(token);
    let lower = token.to_ascii_lowercase();

    if KEYWORDS.contains(&lower.as_str()) {
        return SourceKind::Keyword;
    }
    if let Some(rest) = lower.strip_prefix(NONCE_PREFIX)
        && !rest.is_empty()
    {
        return SourceKind::Nonce;
    }
    if let Some((algorithm, digest)) = lower.split_once('-')
        && !digest.is_empty()
        && let Ok(algorithm) = algorithm.parse::<HashAlgorithm>()
    {
        return SourceKind::Hash(algorithm);
    }
    SourceKind::Raw
}

/// Strip surrounding pairs of single quotes, if present.
pub fn unquote(token: &str) -> &str {
    let mut token = token;
    while token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        token = &token[1..token.len() - 1];
    }
    token
}

/// Render a token for the header: keyword, nonce and hash tokens are quoted.
pub fn quote(token: &str) -> Cow<'_, str> {
    let bare = unquote(token);
    if classify(bare).is_quoted() {
        Cow::Owned(format!("'{}'", bare))
    } else {
        Cow::Borrowed(bare)
    }
}

/// Whether `token` looks like `<sha256|sha384|sha512>-<digest>`.
pub fn is_hash(token: &str) -> bool {
    matches!(classify(token), SourceKind::Hash(_))
}

/// Whether `token` is a `nonce-` source.
pub fn is_nonce(token: &str) -> bool {
    classify(token) == SourceKind::Nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("self"), SourceKind::Keyword);
        assert_eq!(classify("'strict-dynamic'"), SourceKind::Keyword);
        assert_eq!(classify("nonce-abc123"), SourceKind::Nonce);
        assert_eq!(
            classify("sha384-abcdef"),
            SourceKind::Hash(HashAlgorithm::Sha384)
        );
        assert_eq!(classify("https:"), SourceKind::Raw);
        assert_eq!(classify("https://cdn.example.com"), SourceKind::Raw);
        assert_eq!(classify("md5-abcdef"), SourceKind::Raw);
        assert_eq!(classify("nonce-"), SourceKind::Raw);
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("self"), "'self'");
        assert_eq!(quote("'self'"), "'self'");
        assert_eq!(quote("sha256-abc="), "'sha256-abc='");
        assert_eq!(quote("nonce-xyz"), "'nonce-xyz'");
        assert_eq!(quote("data:"), "data:");
        assert_eq!(quote("*.example.com"), "*.example.com");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'none'"), "none");
        assert_eq!(unquote("none"), "none");
        assert_eq!(unquote("'"), "'");
        assert_eq!(unquote("'half"), "'half");
        assert_eq!(unquote("''nested''"), "nested");
        assert_eq!(unquote("''"), "");
    }
}
