//! Build keys and fragment keys.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// An ordered sequence of template handles.
///
/// Declaration order is kept for building; identity ignores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleSet(Vec<String>);

impl HandleSet {
    /// Create a handle set from handles in declaration order.
    pub fn new(handles: Vec<String>) -> Self {
        Self(handles)
    }

    /// Handles in declaration order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Append a handle.
    pub fn push(&mut self, handle: impl Into<String>) {
        self.0.push(handle.into());
    }

    /// Whether a specific handle is part of the set.
    pub fn contains(&self, handle: &str) -> bool {
        self.0.iter().any(|h| h == handle)
    }

    /// Number of handles.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set has no handles.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Content hash of the sorted handles.
    ///
    /// Two sets with equal sorted contents always share a key.
    pub fn build_key(&self) -> BuildKey {
        let mut sorted = self.0.clone();
        sorted.sort();

        // A Vec<String> always serializes.
        let bytes = serde_json::to_vec(&sorted).unwrap_or_default();
        BuildKey(xxh3_64(&bytes))
    }

    /// Consume into the underlying handles.
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for HandleSet {
    fn from(handles: Vec<String>) -> Self {
        Self(handles)
    }
}

impl From<&[&str]> for HandleSet {
    fn from(handles: &[&str]) -> Self {
        Self(handles.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for HandleSet {
    fn from(handles: [&str; N]) -> Self {
        Self(handles.iter().map(|s| s.to_string()).collect())
    }
}

impl<'a> IntoIterator for &'a HandleSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build identity of a [`HandleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildKey(pub u64);

impl std::fmt::Display for BuildKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Persisted key of a fragment: `<cache_key>_<name>`.
pub fn fragment_key(cache_key: &str, name: &str) -> String {
    format!("{}_{}", cache_key, name)
}
