#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{Map, Value};
use wire_cache::{HandleSet, KvStore, MemoryStore};
use wire_components::{
    Component, ComponentLogic, ComponentRef, Engine, Fragment, LayoutResolver, MemoryLayout, Orchestrator,
    ResolveResult, ResolveScope, Resolver, ResolverRegistry, StructureProvider,
};
use wire_core::EngineConfig;

/// Counts clicks, starting from the `start` mount parameter.
#[derive(Debug)]
pub struct Counter;

impl ComponentLogic for Counter {
    fn type_name(&self) -> &str {
        "counter"
    }

    fn mount(&self, params: &Map<String, Value>, state: &mut Map<String, Value>) -> anyhow::Result<()> {
        let start = params.get("start").cloned().unwrap_or(Value::from(0));
        state.insert("count".into(), start);
        Ok(())
    }
}

pub fn counter() -> Component {
    Component::new(Arc::new(Counter))
}

/// `default` holds the widget, `page_layout` a sidebar, `wire_flakes` one flake.
pub fn layout() -> MemoryLayout {
    let layout = MemoryLayout::new();
    layout
        .define(
            "default",
            Fragment::new("widget.foo")
                .with_cache_key("blk1")
                .with_data("wire:mount:start", 5)
                .with_component(ComponentRef::Instance(counter())),
        )
        .define("page_layout", Fragment::container("sidebar").with_child("widget.foo"))
        .define("wire_flakes", Fragment::new("counter").with_data("wire.label", "Clicks"));
    layout
}

pub fn engine(store: Arc<MemoryStore>, layout: &MemoryLayout) -> Engine {
    Engine::new(EngineConfig::default(), store, Arc::new(layout.clone()))
}

/// Build `handles` in the request and clone fragment `name` out of the structure.
pub fn locate(orchestrator: &Orchestrator<'_>, handles: &[&str], name: &str) -> Fragment {
    let structure = orchestrator
        .builder()
        .build(&HandleSet::from(handles), false)
        .expect("structure builds");
    structure.fragment(name).cloned().expect("fragment exists")
}

/// A layout resolver that counts `complies` calls.
#[derive(Debug)]
pub struct Counting {
    inner: LayoutResolver,
    calls: Arc<AtomicUsize>,
}

impl Counting {
    pub fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            inner: LayoutResolver::new(),
            calls,
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
        self.inner.complies(fragment, hint)
    }

    fn construct(&self, fragment: Fragment, scope: &mut ResolveScope<'_>) -> ResolveResult<Fragment> {
        self.inner.construct(fragment, scope)
    }
}

/// An engine whose only strategy counts its probes.
pub fn counting_engine(store: Arc<dyn KvStore>, layout: &MemoryLayout, calls: &Arc<AtomicUsize>) -> Engine {
    let registry = ResolverRegistry::new().with(Counting::new(Arc::clone(calls)));
    Engine::with_parts(
        EngineConfig::default(),
        registry,
        store,
        StructureProvider::fresh(layout.clone()),
    )
}
