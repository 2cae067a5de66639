//! Renderable fragments that may host a component.

use std::sync::Arc;

use serde_json::{Map, Value};
use wire_cache::HandleSet;

use crate::component::Component;
use crate::resolver::Resolver;
use crate::tags::Tags;

/// Well-known fragment data keys.
pub mod data_keys {
    /// Explicit resolver accessor override.
    pub const RESOLVER: &str = "wire:resolver";
    /// Client-visible component name (flakes).
    pub const NAME: &str = "wire:name";
    /// Prefix of mount parameters, e.g. `wire:mount:sku`.
    pub const MOUNT_PREFIX: &str = "wire:mount:";
    /// Prefix of initial component properties, e.g. `wire.count`.
    pub const PROPERTY_PREFIX: &str = "wire.";
    /// Flake element metadata.
    pub const FLAKE: &str = "wire:flake";
}

/// What kind of node a fragment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FragmentKind {
    /// A template-backed renderable element.
    #[default]
    Template,
    /// A pure container of child fragments.
    Container,
}

/// A loosely-typed component reference attached to a fragment.
#[derive(Debug, Clone)]
pub enum ComponentRef {
    /// The component itself.
    Instance(Component),
    /// A wrapper whose `type` entry carries the component.
    Typed(Component),
    /// Any other declared value, e.g. a bare `true`.
    Value(Value),
}

impl ComponentRef {
    /// The wrapped component, if this reference carries one.
    pub fn component(&self) -> Option<&Component> {
        match self {
            Self::Instance(component) | Self::Typed(component) => Some(component),
            Self::Value(_) => None,
        }
    }

    /// Unwrap into the component, if any.
    pub fn into_component(self) -> Option<Component> {
        match self {
            Self::Instance(component) | Self::Typed(component) => Some(component),
            Self::Value(_) => None,
        }
    }
}

/// A renderable node in a built structure.
#[derive(Debug, Clone)]
pub struct Fragment {
    name: String,
    alias: Option<String>,
    cache_key: String,
    kind: FragmentKind,
    data: Map<String, Value>,
    component: Option<ComponentRef>,
    resolver: Option<Arc<dyn Resolver>>,
    children: Vec<String>,
    handles: HandleSet,
    tags: Tags,
}

impl Fragment {
    /// Create a template fragment. Its cache key defaults to its name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            cache_key: name.clone(),
            name,
            alias: None,
            kind: FragmentKind::Template,
            data: Map::new(),
            component: None,
            resolver: None,
            children: Vec::new(),
            handles: HandleSet::default(),
            tags: Tags::new(),
        }
    }

    /// Create a container fragment.
    pub fn container(name: impl Into<String>) -> Self {
        Self::new(name).with_kind(FragmentKind::Container)
    }

    /// Set the kind.
    pub fn with_kind(mut self, kind: FragmentKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the cache key.
    pub fn with_cache_key(mut self, cache_key: impl Into<String>) -> Self {
        self.cache_key = cache_key.into();
        self
    }

    /// Set a data entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Attach a component reference.
    pub fn with_component(mut self, component: ComponentRef) -> Self {
        self.component = Some(component);
        self
    }

    /// Attach a live resolver that bypasses all resolution steps.
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Add a child fragment name.
    pub fn with_child(mut self, name: impl Into<String>) -> Self {
        self.children.push(name.into());
        self
    }

    /// Set the governing handle set.
    pub fn with_handles(mut self, handles: HandleSet) -> Self {
        self.handles = handles;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = Some(alias.into());
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn kind(&self) -> FragmentKind {
        self.kind
    }

    /// Whether this is a template fragment.
    pub fn is_template(&self) -> bool {
        self.kind == FragmentKind::Template
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// A single data entry.
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn has_data(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn set_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Merge entries into the data map, overwriting existing keys.
    pub fn add_data(&mut self, data: Map<String, Value>) {
        self.data.extend(data);
    }

    /// Merge entries into the data map, keeping existing keys.
    pub fn add_data_defaults(&mut self, data: Map<String, Value>) {
        for (key, value) in data {
            self.data.entry(key).or_insert(value);
        }
    }

    /// The explicit resolver accessor declared in data.
    pub fn resolver_override(&self) -> Option<&str> {
        self.data.get(data_keys::RESOLVER).and_then(Value::as_str)
    }

    pub fn component(&self) -> Option<&ComponentRef> {
        self.component.as_ref()
    }

    pub fn has_component(&self) -> bool {
        self.component.is_some()
    }

    /// Bind a component, replacing any previous reference.
    pub fn bind_component(&mut self, component: Component) {
        self.component = Some(ComponentRef::Instance(component));
    }

    /// Detach the component reference.
    pub fn take_component(&mut self) -> Option<ComponentRef> {
        self.component.take()
    }

    pub fn resolver(&self) -> Option<&Arc<dyn Resolver>> {
        self.resolver.as_ref()
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn handles(&self) -> &HandleSet {
        &self.handles
    }

    pub(crate) fn set_handles(&mut self, handles: HandleSet) {
        self.handles = handles;
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut Tags {
        &mut self.tags
    }
}
