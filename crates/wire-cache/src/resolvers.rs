//! Long-lived fragment → resolver mapping.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::fragment_key;
use crate::{Cache, CacheError, KvStore};

/// Persisted identity of one resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverRecord {
    /// Type identifier used to instantiate the resolver.
    pub class: String,
    /// Display name (the accessor).
    pub name: String,
    /// Fragment keys resolved to this accessor.
    #[serde(default)]
    pub blocks: Vec<String>,
}

/// The persisted resolver cache document.
///
/// ```text
/// {
///   "blocks":    { "<fragmentCacheKey>_<fragmentName>": "<accessor>" },
///   "resolvers": { "<accessor>": { "class": "...", "name": "...", "blocks": [...] } }
/// }
/// ```
///
/// Older writers stored `"<fragmentCacheKey>": "<accessor>"` (or
/// `{"accessor": "..."}`) at the top level; those entries are kept in
/// `legacy` and still honoured on lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverDocument {
    #[serde(default)]
    pub blocks: BTreeMap<String, String>,
    #[serde(default)]
    pub resolvers: BTreeMap<String, ResolverRecord>,
    #[serde(flatten)]
    pub legacy: BTreeMap<String, Value>,
}

impl ResolverDocument {
    /// Accessor stored in the legacy top-level format for a fragment cache key.
    pub fn legacy_accessor(&self, cache_key: &str) -> Option<&str> {
        match self.legacy.get(cache_key)? {
            Value::String(accessor) => Some(accessor),
            Value::Object(entry) => entry.get("accessor").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Accessor recorded for a `(cache key, name)` pair.
    pub fn block_accessor(&self, cache_key: &str, name: &str) -> Option<&str> {
        self.blocks
            .get(&fragment_key(cache_key, name))
            .map(String::as_str)
    }

    /// Type identifier recorded for an accessor.
    pub fn resolver_class(&self, accessor: &str) -> Option<&str> {
        self.resolvers.get(accessor).map(|r| r.class.as_str())
    }

    /// Record that `(cache_key, name)` resolved to `accessor`.
    ///
    /// An existing record keeps its class and name.
    pub fn remember(&mut self, cache_key: &str, name: &str, accessor: &str, class: &str) {
        let key = fragment_key(cache_key, name);
        self.blocks.insert(key.clone(), accessor.to_string());

        let record = self
            .resolvers
            .entry(accessor.to_string())
            .or_insert_with(|| ResolverRecord {
                class: class.to_string(),
                name: accessor.to_string(),
                blocks: Vec::new(),
            });

        if !record.blocks.contains(&key) {
            record.blocks.push(key);
        }
    }

    /// Whether the document holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.resolvers.is_empty() && self.legacy.is_empty()
    }
}

/// Resolver cache backed by a [`KvStore`].
#[derive(Debug, Clone)]
pub struct ResolversCache {
    cache: Cache,
    key: String,
}

impl ResolversCache {
    /// Create a resolver cache storing its document under `key`.
    pub fn new(store: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        Self {
            cache: Cache::new(store),
            key: key.into(),
        }
    }

    /// The store key of the document.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the document. A missing document reads as empty.
    pub fn fetch(&self) -> Result<ResolverDocument, CacheError> {
        match self.cache.get(&self.key)? {
            Some(document) => Ok(document),
            None => {
                tracing::trace!(key = %self.key, "resolver cache document missing");
                Ok(ResolverDocument::default())
            }
        }
    }

    /// Persist the document.
    pub fn save(&self, document: &ResolverDocument) -> Result<(), CacheError> {
        self.cache.set(&self.key, document)?;
        tracing::debug!(
            key = %self.key,
            blocks = document.blocks.len(),
            resolvers = document.resolvers.len(),
            "resolver cache saved"
        );
        Ok(())
    }

    /// Drop the document.
    pub fn flush(&self) -> Result<(), CacheError> {
        self.cache.delete(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn test_remember_writes_both_maps() {
        let mut doc = ResolverDocument::default();
        doc.remember("blk1", "widget.foo", "layout", "resolver.layout");
        doc.remember("blk1", "widget.foo", "layout", "resolver.other");
        doc.remember("blk2", "widget.bar", "layout", "resolver.layout");

        assert_eq!(doc.block_accessor("blk1", "widget.foo"), Some("layout"));
        assert_eq!(doc.resolver_class("layout"), Some("resolver.layout"));

        let record = &doc.resolvers["layout"];
        assert_eq!(record.name, "layout");
        assert_eq!(
            record.blocks,
            vec!["blk1_widget.foo".to_string(), "blk2_widget.bar".to_string()]
        );
    }

    #[test]
    fn test_document_shape() {
        let mut doc = ResolverDocument::default();
        doc.remember("blk1", "widget.foo", "layout", "resolver.layout");

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["blocks"]["blk1_widget.foo"], "layout");
        assert_eq!(value["resolvers"]["layout"]["class"], "resolver.layout");
        assert_eq!(value["resolvers"]["layout"]["name"], "layout");
    }

    #[test]
    fn test_legacy_entries() {
        let doc: ResolverDocument = serde_json::from_str(
            r#"{"blk1":"layout","blk2":{"accessor":"flake"},"blk3":7,"blocks":{}}"#,
        )
        .unwrap();

        assert_eq!(doc.legacy_accessor("blk1"), Some("layout"));
        assert_eq!(doc.legacy_accessor("blk2"), Some("flake"));
        assert_eq!(doc.legacy_accessor("blk3"), None);
        assert_eq!(doc.legacy_accessor("missing"), None);
    }

    #[test]
    fn test_legacy_entries_survive_rewrite() {
        let mut doc: ResolverDocument = serde_json::from_str(r#"{"blk1":"layout"}"#).unwrap();
        doc.remember("blk2", "widget", "flake", "resolver.flake");

        let reread: ResolverDocument =
            serde_json::from_str(&serde_json::to_string(&doc).unwrap()).unwrap();
        assert_eq!(reread.legacy_accessor("blk1"), Some("layout"));
        assert_eq!(reread.block_accessor("blk2", "widget"), Some("flake"));
    }

    #[test]
    fn test_fetch_save_flush() {
        let cache = ResolversCache::new(Arc::new(MemoryStore::new()), "wire_resolvers");
        assert!(cache.fetch().unwrap().is_empty());

        let mut doc = cache.fetch().unwrap();
        doc.remember("blk1", "widget.foo", "layout", "resolver.layout");
        cache.save(&doc).unwrap();
        assert_eq!(cache.fetch().unwrap(), doc);

        cache.flush().unwrap();
        assert!(cache.fetch().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_corrupt_document() {
        let store = Arc::new(MemoryStore::new());
        store.set("wire_resolvers", b"{broken").unwrap();

        let cache = ResolversCache::new(store, "wire_resolvers");
        assert!(cache.fetch().is_err());
    }
}
