//! Resolver selection with a long-lived cache.
//!
//! Resolution order for a fragment:
//! 1. a live resolver set on the fragment
//! 2. a cached or declared accessor (legacy cache entry, `wire:resolver`
//!    data, then the `blocks` map)
//! 3. probing every registered strategy in registration order
//!
//! Step 2 never fails resolution: a broken cache or an unknown accessor is
//! logged and the probe runs instead. A successful probe is remembered.

use std::sync::Arc;

use wire_cache::{ResolverDocument, ResolversCache};

use crate::error::{ResolveError, ResolveResult};
use crate::fragment::Fragment;
use crate::resolver::{Resolver, ResolverRegistry};

/// Picks resolver strategies for fragments.
#[derive(Debug, Clone)]
pub struct ResolverManager {
    registry: ResolverRegistry,
    cache: ResolversCache,
}

impl ResolverManager {
    pub fn new(registry: ResolverRegistry, cache: ResolversCache) -> Self {
        Self { registry, cache }
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ResolversCache {
        &self.cache
    }

    /// Select the resolver for `fragment`.
    pub fn resolve(&self, fragment: &Fragment) -> ResolveResult<Arc<dyn Resolver>> {
        if let Some(resolver) = fragment.resolver() {
            return Ok(Arc::clone(resolver));
        }

        let document = match self.fetch_document() {
            Ok(document) => Some(document),
            Err(err) => {
                tracing::warn!(error = %err, key = self.cache.key(), "resolver cache unreadable, probing");
                None
            }
        };

        if let Some(resolver) = self.cached(fragment, document.as_ref()) {
            return Ok(resolver);
        }

        let resolver = self.probe(fragment)?;
        if resolver.remember() {
            self.persist(fragment, resolver.as_ref(), document);
        }
        Ok(resolver)
    }

    /// Resolver for an accessor in the known mapping.
    pub fn create_by_accessor(&self, accessor: &str) -> ResolveResult<Arc<dyn Resolver>> {
        self.registry
            .by_accessor(accessor)
            .ok_or_else(|| ResolveError::ResolverNotFound(format!("unknown resolver accessor \"{}\"", accessor)))
    }

    /// Resolver for a type identifier.
    pub fn create_by_type(&self, kind: &str) -> ResolveResult<Arc<dyn Resolver>> {
        self.registry
            .by_kind(kind)
            .ok_or_else(|| ResolveError::ResolverNotFound(format!("unknown resolver type \"{}\"", kind)))
    }

    /// Resolver for an accessor, falling back to reading it as a type identifier.
    pub fn instantiate(&self, accessor: &str) -> ResolveResult<Arc<dyn Resolver>> {
        self.create_by_accessor(accessor)
            .or_else(|_| self.create_by_type(accessor))
            .map_err(|_| ResolveError::ResolverNotFound(format!("unknown resolver \"{}\"", accessor)))
    }

    /// Whether `accessor` is in the known mapping.
    pub fn has_resolver_in_mapping(&self, accessor: &str) -> bool {
        self.registry.by_accessor(accessor).is_some()
    }

    fn fetch_document(&self) -> ResolveResult<ResolverDocument> {
        Ok(self.cache.fetch()?)
    }

    fn cached(&self, fragment: &Fragment, document: Option<&ResolverDocument>) -> Option<Arc<dyn Resolver>> {
        let accessor = document
            .and_then(|d| d.legacy_accessor(fragment.cache_key()))
            .or_else(|| fragment.resolver_override())
            .or_else(|| document.and_then(|d| d.block_accessor(fragment.cache_key(), fragment.name())))?;

        let resolved = self.create_by_accessor(accessor).or_else(|_| {
            let kind = document
                .and_then(|d| d.resolver_class(accessor))
                .unwrap_or(accessor);
            self.create_by_type(kind)
        });

        match resolved {
            Ok(resolver) => {
                tracing::debug!(fragment = fragment.name(), accessor, "resolver served from cache");
                Some(resolver)
            }
            Err(err) => {
                tracing::info!(fragment = fragment.name(), accessor, error = %err, "cached resolver unusable, probing");
                None
            }
        }
    }

    fn probe(&self, fragment: &Fragment) -> ResolveResult<Arc<dyn Resolver>> {
        // Ties go to the first strategy in registration order.
        let found = self
            .registry
            .strategies()
            .iter()
            .find(|strategy| strategy.complies(fragment, fragment.component()))
            .cloned();

        match found {
            Some(resolver) => {
                tracing::debug!(fragment = fragment.name(), accessor = resolver.accessor(), "resolver probed");
                Ok(resolver)
            }
            None => {
                tracing::error!(fragment = fragment.name(), cache_key = fragment.cache_key(), "no resolver complies");
                Err(ResolveError::ResolverNotFound(format!(
                    "no resolver complies with fragment \"{}\"",
                    fragment.name()
                )))
            }
        }
    }

    fn persist(&self, fragment: &Fragment, resolver: &dyn Resolver, document: Option<ResolverDocument>) {
        let mut document = document.unwrap_or_default();
        document.remember(fragment.cache_key(), fragment.name(), resolver.accessor(), resolver.kind());

        if let Err(err) = self.cache.save(&document).map_err(ResolveError::from) {
            tracing::warn!(error = %err, accessor = resolver.accessor(), "could not persist resolver cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wire_cache::{CacheError, KvStore, MemoryStore};

    use crate::component::{Component, ComponentLogic};
    use crate::fragment::{data_keys, ComponentRef};
    use crate::resolver::{LayoutResolver, ResolveScope};

    #[derive(Debug)]
    struct Widget;

    impl ComponentLogic for Widget {
        fn type_name(&self) -> &str {
            "widget"
        }
    }

    /// Layout resolver that counts `complies` calls.
    #[derive(Debug)]
    struct Counting {
        inner: LayoutResolver,
        calls: Arc<AtomicUsize>,
        remember: bool,
    }

    impl Counting {
        fn new(accessor: &str, calls: Arc<AtomicUsize>) -> Self {
            Self {
                inner: LayoutResolver::bare(accessor, format!("resolver.{}", accessor)),
                calls,
                remember: true,
            }
        }
    }

    impl Resolver for Counting {
        fn accessor(&self) -> &str {
            self.inner.accessor()
        }

        fn kind(&self) -> &str {
            self.inner.kind()
        }

        fn complies(&self, fragment: &Fragment, hint: Option<&ComponentRef>) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fragment.is_template() && hint.is_some()
        }

        fn construct(&self, fragment: Fragment, scope: &mut ResolveScope<'_>) -> ResolveResult<Fragment> {
            self.inner.construct(fragment, scope)
        }

        fn remember(&self) -> bool {
            self.remember
        }
    }

    struct BrokenStore;

    impl KvStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Store("offline".into()))
        }

        fn set(&self, _key: &str, _value: &[u8]) -> Result<(), CacheError> {
            Err(CacheError::Store("offline".into()))
        }

        fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Ok(())
        }
    }

    #[test]
    fn test_unreadable_cache_is_a_lookup_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = manager(Arc::new(BrokenStore), &calls);

        let err = manager.fetch_document().unwrap_err();
        assert!(matches!(err, ResolveError::CacheLookup(CacheError::Store(_))));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.to_string(), "resolver cache lookup failed: Store operation failed: offline");
    }

    fn widget_fragment() -> Fragment {
        Fragment::new("widget.foo")
            .with_cache_key("blk1")
            .with_component(ComponentRef::Instance(Component::new(Arc::new(Widget))))
    }

    fn manager(store: Arc<dyn KvStore>, calls: &Arc<AtomicUsize>) -> ResolverManager {
        let registry = ResolverRegistry::new().with(Counting::new("layout", Arc::clone(calls)));
        ResolverManager::new(registry, ResolversCache::new(store, "wire_resolvers"))
    }

    #[test]
    fn test_probe_then_cache_hit() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let first = manager(Arc::clone(&store), &calls).resolve(&widget_fragment()).unwrap();
        assert_eq!(first.accessor(), "layout");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let second = manager(Arc::clone(&store), &calls).resolve(&widget_fragment()).unwrap();
        assert_eq!(second.accessor(), "layout");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let document = ResolversCache::new(store, "wire_resolvers").fetch().unwrap();
        assert_eq!(document.block_accessor("blk1", "widget.foo"), Some("layout"));
        assert_eq!(document.resolver_class("layout"), Some("resolver.layout"));
    }

    #[test]
    fn test_first_registered_wins() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ResolverRegistry::new()
            .with(Counting::new("first", Arc::clone(&calls)))
            .with(Counting::new("second", Arc::clone(&calls)));
        let manager = ResolverManager::new(
            registry,
            ResolversCache::new(Arc::new(MemoryStore::new()), "wire_resolvers"),
        );

        assert_eq!(manager.resolve(&widget_fragment()).unwrap().accessor(), "first");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_live_resolver_bypasses_everything() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryStore::new());
        let manager = manager(store.clone(), &calls);

        let live: Arc<dyn Resolver> = Arc::new(LayoutResolver::bare("live", "resolver.live"));
        let fragment = widget_fragment().with_resolver(live);

        assert_eq!(manager.resolve(&fragment).unwrap().accessor(), "live");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_data_override_skips_probe() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = manager(Arc::new(MemoryStore::new()), &calls);
        let fragment = widget_fragment().with_data(data_keys::RESOLVER, "layout");

        assert_eq!(manager.resolve(&fragment).unwrap().accessor(), "layout");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_legacy_entry_and_type_fallback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        store
            .set(
                "wire_resolvers",
                &serde_json::to_vec(&json!({"blk1": {"accessor": "resolver.layout"}})).unwrap(),
            )
            .unwrap();

        let manager = manager(store, &calls);
        assert_eq!(manager.resolve(&widget_fragment()).unwrap().accessor(), "layout");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unknown_cached_accessor_falls_back_to_probe() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = manager(Arc::new(MemoryStore::new()), &calls);
        let fragment = widget_fragment().with_data(data_keys::RESOLVER, "vanished");

        assert_eq!(manager.resolve(&fragment).unwrap().accessor(), "layout");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_broken_store_degrades_to_probe() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = manager(Arc::new(BrokenStore), &calls);

        assert_eq!(manager.resolve(&widget_fragment()).unwrap().accessor(), "layout");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_compliant_resolver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = manager(Arc::new(MemoryStore::new()), &calls);

        let err = manager.resolve(&Fragment::new("bare")).unwrap_err();
        assert!(matches!(err, ResolveError::ResolverNotFound(_)));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_remember_false_skips_persist() {
        let calls = Arc::new(AtomicUsize::new(0));
        let store = Arc::new(MemoryStore::new());
        let mut forgetful = Counting::new("layout", Arc::clone(&calls));
        forgetful.remember = false;
        let manager = ResolverManager::new(
            ResolverRegistry::new().with(forgetful),
            ResolversCache::new(store.clone(), "wire_resolvers"),
        );

        manager.resolve(&widget_fragment()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_instantiate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = manager(Arc::new(MemoryStore::new()), &calls);

        assert!(manager.has_resolver_in_mapping("layout"));
        assert!(!manager.has_resolver_in_mapping("resolver.layout"));
        assert_eq!(manager.instantiate("resolver.layout").unwrap().accessor(), "layout");
        assert!(manager.instantiate("nope").unwrap_err().is_bad_request());
    }
}
