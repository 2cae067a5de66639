//! Recognizable tags on fragments.

use serde::{Deserialize, Serialize};

/// An ordered, sanitized tag list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(Vec<String>);

impl Tags {
    /// Create an empty tag list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tag. It is lowercased and stripped to `[a-z0-9]`; empty results are dropped.
    pub fn with_tag(&mut self, tag: &str) -> &mut Self {
        let sanitized = sanitize(tag);
        if !sanitized.is_empty() {
            self.0.push(sanitized);
        }
        self
    }

    /// Add every tag that is not present yet.
    pub fn with_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            let tag = sanitize(tag.as_ref());
            if tag.is_empty() || self.has_tags(&[tag.as_str()], false) {
                continue;
            }
            self.0.push(tag);
        }
        self
    }

    /// Keep only the tags matching `keep`.
    pub fn retain_tags<F>(&mut self, keep: F) -> &mut Self
    where
        F: Fn(&str) -> bool,
    {
        self.0.retain(|tag| keep(tag));
        self
    }

    /// Remove every tag.
    pub fn clear_tags(&mut self) -> &mut Self {
        self.0.clear();
        self
    }

    /// Check for tags.
    ///
    /// An empty query is always false. Strict requires every tag, otherwise any will do.
    pub fn has_tags(&self, tags: &[&str], strict: bool) -> bool {
        if tags.is_empty() {
            return false;
        }

        let present = |tag: &&str| self.0.iter().any(|t| t == tag);
        if strict {
            tags.iter().all(present)
        } else {
            tags.iter().any(present)
        }
    }

    /// The tags, in insertion order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

fn sanitize(tag: &str) -> String {
    tag.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_tag_sanitizes() {
        let mut tags = Tags::new();
        tags.with_tag("Wire-Flake!").with_tag("***").with_tag("v2");
        assert_eq!(tags.as_slice(), &["wireflake".to_string(), "v2".to_string()]);
    }

    #[test]
    fn test_with_tags_skips_present() {
        let mut tags = Tags::new();
        tags.with_tags(["wire", "flake", "wire"]);
        assert_eq!(tags.as_slice(), &["wire".to_string(), "flake".to_string()]);
    }

    #[test]
    fn test_with_tags_compares_sanitized_form() {
        let mut tags = Tags::new();
        tags.with_tags(["wire"]).with_tags(["Wire", "FLAKE!", "flake", "--"]);
        assert_eq!(tags.as_slice(), &["wire".to_string(), "flake".to_string()]);
    }

    #[test]
    fn test_has_tags() {
        let mut tags = Tags::new();
        tags.with_tags(["wire", "flake"]);

        assert!(!tags.has_tags(&[], false));
        assert!(tags.has_tags(&["flake", "other"], false));
        assert!(!tags.has_tags(&["flake", "other"], true));
        assert!(tags.has_tags(&["flake", "wire"], true));
    }

    #[test]
    fn test_clear_tags() {
        let mut tags = Tags::new();
        tags.with_tags(["wire", "flake", "legacy"]);

        tags.retain_tags(|t| t != "legacy");
        assert_eq!(tags.as_slice(), &["wire".to_string(), "flake".to_string()]);

        tags.clear_tags();
        assert!(tags.as_slice().is_empty());
    }
}
