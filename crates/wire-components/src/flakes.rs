//! Flakes: lightweight components declared inline through a directive.
//!
//! Every flake fragment lives in one structure under the configured sentinel
//! handle. A directive names the flake, passes data (optionally referencing
//! template variables as `$name`) and metadata, and the factory turns that
//! into a fragment ready for resolution.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wire_cache::HandleSet;

use crate::component::{Component, ComponentLogic};
use crate::context::{Hooks, LifecycleEvent};
use crate::error::{ResolveError, ResolveResult};
use crate::fragment::{data_keys, Fragment};
use crate::resolver::FLAKE_ACCESSOR;
use crate::structure::StructureBuilder;

/// Memo key carrying flake element metadata.
pub const FLAKE_MEMO: &str = "flake";

/// The default flake component.
#[derive(Debug, Default)]
pub struct Flake;

impl Flake {
    /// A fresh default flake component.
    pub fn component() -> Component {
        Component::new(Arc::new(Flake))
    }
}

impl ComponentLogic for Flake {
    fn type_name(&self) -> &str {
        "flake"
    }
}

/// A pre-parsed directive occurrence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectiveCall {
    /// Flake name, used as the fragment lookup name and the alias.
    pub component: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DirectiveCall {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            ..Default::default()
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Creates flake fragments from the flakes structure.
#[derive(Debug)]
pub struct FlakeFactory<'a> {
    builder: &'a StructureBuilder,
    handles: HandleSet,
}

impl<'a> FlakeFactory<'a> {
    pub fn new(builder: &'a StructureBuilder, flakes_handle: impl Into<String>) -> Self {
        Self {
            builder,
            handles: HandleSet::new(vec![flakes_handle.into()]),
        }
    }

    /// Look up a flake by name and merge `data` into it.
    ///
    /// The component defaults to a fresh [`Flake`] and the resolver override
    /// to the flake resolver.
    pub fn create_by_name(&self, name: &str, data: Map<String, Value>) -> ResolveResult<Fragment> {
        let structure = self.builder.build(&self.handles, false)?;
        let mut fragment = structure
            .fragment(name)
            .cloned()
            .ok_or_else(|| ResolveError::FragmentNotFound(name.to_string()))?;

        fragment.add_data(data);
        if !fragment.has_component() {
            fragment.bind_component(Flake::component());
        }
        if !fragment.has_data(data_keys::RESOLVER) {
            fragment.set_data(data_keys::RESOLVER, FLAKE_ACCESSOR);
        }
        Ok(fragment)
    }

    /// Turn a directive occurrence into a flake fragment.
    pub fn from_directive(&self, call: &DirectiveCall, variables: &Map<String, Value>) -> ResolveResult<Fragment> {
        let data = call
            .data
            .iter()
            .map(|(key, value)| (key.clone(), substitute(value, variables)))
            .collect();

        let mut fragment = self.create_by_name(&call.component, data)?;
        fragment.set_alias(call.component.as_str());

        if let Some(name) = fragment
            .data_value(data_keys::NAME)
            .and_then(Value::as_str)
            .map(str::to_string)
        {
            fragment.set_name(name);
        }

        if !call.metadata.is_empty() {
            fragment.set_data(data_keys::FLAKE, Value::Object(call.metadata.clone()));
        }

        fragment.tags_mut().clear_tags().with_tags(["wire", "flake"]);
        Ok(fragment)
    }
}

/// Replace a `$name` string with `variables[name]` when present.
fn substitute(value: &Value, variables: &Map<String, Value>) -> Value {
    value
        .as_str()
        .and_then(|s| s.strip_prefix('$'))
        .and_then(|name| variables.get(name))
        .cloned()
        .unwrap_or_else(|| value.clone())
}

/// Carry flake element metadata across requests.
pub fn register_hooks(hooks: &mut Hooks) {
    hooks
        .on(LifecycleEvent::Dehydrate, |context| {
            let element = context
                .component()
                .fragment()
                .and_then(|fragment| fragment.data_value(data_keys::FLAKE))
                .and_then(|flake| flake.get("element"))
                .filter(|element| element.is_object())
                .cloned();

            if let Some(element) = element {
                context.push_memo(FLAKE_MEMO, element, Some("element"));
            }
            Ok(())
        })
        .on(LifecycleEvent::Hydrate, |context| {
            let Some(flake) = context.memo().get(FLAKE_MEMO).filter(|v| v.is_object()).cloned() else {
                return Ok(());
            };

            if let Some(fragment) = context.component_mut().fragment_mut() {
                fragment.set_data(data_keys::FLAKE, flake);
            }
            Ok(())
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::context::ComponentContext;
    use crate::memory::MemoryLayout;
    use crate::structure::StructureProvider;

    fn builder() -> StructureBuilder {
        let layout = MemoryLayout::new();
        layout.define("wire_flakes", Fragment::new("counter").with_data("step", 1));
        StructureBuilder::new(StructureProvider::fresh(layout))
    }

    #[test]
    fn test_create_by_name_defaults() {
        let builder = builder();
        let factory = FlakeFactory::new(&builder, "wire_flakes");

        let fragment = factory.create_by_name("counter", Map::new()).unwrap();
        assert_eq!(fragment.resolver_override(), Some(FLAKE_ACCESSOR));
        assert_eq!(fragment.data_value("step"), Some(&json!(1)));
        assert!(fragment.has_component());
        assert!(fragment.handles().contains("wire_flakes"));

        let err = factory.create_by_name("ghost", Map::new()).unwrap_err();
        assert!(matches!(err, ResolveError::FragmentNotFound(_)));
    }

    #[test]
    fn test_from_directive() {
        let builder = builder();
        let factory = FlakeFactory::new(&builder, "wire_flakes");

        let call = DirectiveCall::new("counter")
            .with_data("wire:name", "$target")
            .with_data("wire.count", "$missing")
            .with_metadata("element", json!({"tag": "span"}));
        let mut variables = Map::new();
        variables.insert("target".into(), json!("sidebar-counter"));

        let fragment = factory.from_directive(&call, &variables).unwrap();
        assert_eq!(fragment.name(), "sidebar-counter");
        assert_eq!(fragment.alias(), Some("counter"));
        assert_eq!(fragment.cache_key(), "counter");
        assert_eq!(fragment.data_value("wire.count"), Some(&json!("$missing")));
        assert_eq!(fragment.data_value("wire:flake"), Some(&json!({"element": {"tag": "span"}})));
        assert!(fragment.tags().has_tags(&["wire", "flake"], true));
    }

    #[test]
    fn test_hooks_round_trip_element() {
        let mut hooks = Hooks::new();
        register_hooks(&mut hooks);

        let mut component = Flake::component();
        component.set_fragment(Fragment::new("counter").with_data("wire:flake", json!({"element": {"tag": "span"}})));
        let mut context = ComponentContext::new(&mut component);
        hooks.fire(LifecycleEvent::Dehydrate, &mut context).unwrap();
        let (memo, _) = context.into_parts();
        assert_eq!(memo["flake"], json!({"element": {"tag": "span"}}));

        let mut restored = Flake::component();
        restored.set_fragment(Fragment::new("counter"));
        let mut context = ComponentContext::new(&mut restored).with_memo(memo);
        hooks.fire(LifecycleEvent::Hydrate, &mut context).unwrap();
        drop(context);

        let fragment = restored.fragment().unwrap();
        assert_eq!(fragment.data_value("wire:flake"), Some(&json!({"element": {"tag": "span"}})));
    }
}
