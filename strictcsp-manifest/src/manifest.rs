//! Persisted manifest of script and style hashes for one route.

use serde::{Deserialize, Serialize};

/// A script that must be trusted by the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// URL of an external script; `None` for inline scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// `<algorithm>-<base64digest>`
    pub hash: String,
}

impl ScriptEntry {
    /// Entry for an inline script.
    pub fn inline(hash: impl Into<String>) -> Self {
        Self {
            src: None,
            hash: hash.into(),
        }
    }

    /// Entry for an external script carrying an integrity hash.
    pub fn external(src: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            src: Some(src.into()),
            hash: hash.into(),
        }
    }
}

/// Style hashes split by where the style appears.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleHashes {
    /// `<style>` element bodies
    #[serde(default)]
    pub elem: Vec<String>,
    /// `style="..."` attribute values
    #[serde(default)]
    pub attr: Vec<String>,
}

/// Hashes collected for a route.
///
/// All lists have set semantics: inserting a hash that is already present
/// is a no-op, and insertion order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CspManifest {
    #[serde(default)]
    pub scripts: Vec<ScriptEntry>,
    #[serde(default)]
    pub styles: StyleHashes,
}

impl CspManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a script entry. Entries are keyed by hash; a known hash only
    /// gains a `src` if it had none. Returns whether the hash was new.
    pub fn add_script(&mut self, entry: ScriptEntry) -> bool {
        match self.scripts.iter_mut().find(|s| s.hash == entry.hash) {
            Some(existing) => {
                if existing.src.is_none() && entry.src.is_some() {
                    existing.src = entry.src;
                }
                false
            }
            None => {
                self.scripts.push(entry);
                true
            }
        }
    }

    /// Insert a `<style>` element hash. Returns whether it was new.
    pub fn add_style_elem(&mut self, hash: impl Into<String>) -> bool {
        insert_unique(&mut self.styles.elem, hash.into())
    }

    /// Insert a style attribute hash. Returns whether it was new.
    pub fn add_style_attr(&mut self, hash: impl Into<String>) -> bool {
        insert_unique(&mut self.styles.attr, hash.into())
    }

    /// Union `other` into `self`.
    pub fn merge(&mut self, other: &CspManifest) {
        for script in &other.scripts {
            self.add_script(script.clone());
        }
        for hash in &other.styles.elem {
            self.add_style_elem(hash.clone());
        }
        for hash in &other.styles.attr {
            self.add_style_attr(hash.clone());
        }
    }

    /// Script hashes in insertion order.
    pub fn script_hashes(&self) -> Vec<String> {
        self.scripts.iter().map(|s| s.hash.clone()).collect()
    }

    pub fn has_style_hashes(&self) -> bool {
        !self.styles.elem.is_empty() || !self.styles.attr.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty() && !self.has_style_hashes()
    }
}

fn insert_unique(list: &mut Vec<String>, value: String) -> bool {
    if list.contains(&value) {
        false
    } else {
        list.push(value);
        true
    }
}
