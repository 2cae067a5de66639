use wire_cache::HandleSet;
use wire_core::Snapshot;

use super::{HandleRecovery, LayoutResolver, ResolveScope, Resolver};
use crate::conditions::Conditions;
use crate::error::ResolveResult;
use crate::flakes::Flake;
use crate::fragment::{ComponentRef, Fragment};

/// Accessor of the flake resolver.
pub const FLAKE_ACCESSOR: &str = "flake";
/// Type identifier of the flake resolver.
pub const FLAKE_KIND: &str = "resolver.flake";

/// Resolves fragments built from the flakes structure.
///
/// Flakes always live under one sentinel handle, so nothing but the alias
/// needs to travel in the memo.
#[derive(Debug)]
pub struct FlakeResolver {
    layout: LayoutResolver,
    flakes_handle: String,
}

impl FlakeResolver {
    pub fn new(flakes_handle: impl Into<String>) -> Self {
        let flakes_handle = flakes_handle.into();
        let sentinel = flakes_handle.clone();

        let conditions = Conditions::new()
            .with("template fragment", |fragment, _| fragment.is_template())
            .with("flakes handle", move |fragment, _| fragment.handles().contains(&sentinel));

        let layout = LayoutResolver::bare(FLAKE_ACCESSOR, FLAKE_KIND)
            .with_conditions(conditions)
            .with_handles(HandleRecovery::Fixed(HandleSet::new(vec![flakes_handle.clone()])));

        Self { layout, flakes_handle }
    }

    pub fn flakes_handle(&self) -> &str {
        &self.flakes_handle
    }
}

impl Resolver for FlakeResolver {
    fn accessor(&self) -> &str {
        self.layout.accessor()
    }

    fn kind(&self) -> &str {
        self.layout.kind()
    }

    fn complies(&self, fragment: &Fragment, hint: Option<&ComponentRef>) -> bool {
        self.layout.complies(fragment, hint)
    }

    fn construct(&self, mut fragment: Fragment, scope: &mut ResolveScope<'_>) -> ResolveResult<Fragment> {
        if fragment.alias().is_some() && !fragment.has_component() {
            fragment.bind_component(Flake::component());
        }
        self.layout.construct(fragment, scope)
    }

    fn recover_handles(&self, snapshot: &Snapshot) -> HandleSet {
        self.layout.recover_handles(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wire_core::ComponentRequestContext;

    use crate::context::Hooks;
    use crate::memory::MemoryLayout;
    use crate::structure::{StructureBuilder, StructureProvider};

    fn layout() -> MemoryLayout {
        let layout = MemoryLayout::new();
        layout.define("wire_flakes", Fragment::new("counter"));
        layout
    }

    #[test]
    fn test_complies_on_flakes_handle() {
        let resolver = FlakeResolver::new("wire_flakes");
        let flake = Fragment::new("counter").with_handles(HandleSet::from(["wire_flakes"]));
        let plain = Fragment::new("counter").with_handles(HandleSet::from(["default"]));

        assert!(resolver.complies(&flake, None));
        assert!(!resolver.complies(&plain, None));
        assert!(!resolver.complies(&Fragment::container("c").with_handles(HandleSet::from(["wire_flakes"])), None));
    }

    #[test]
    fn test_construct_binds_default_flake() {
        let builder = StructureBuilder::new(StructureProvider::fresh(layout()));
        let mut hooks = Hooks::new();
        let mut scope = ResolveScope::new(&builder, &mut hooks);
        let resolver = FlakeResolver::new("wire_flakes");

        let fragment = resolver
            .construct(Fragment::new("counter").with_alias("counter"), &mut scope)
            .unwrap();
        let component = fragment.component().and_then(ComponentRef::component).unwrap();
        assert_eq!(component.logic().type_name(), "flake");

        // Without an alias there is nothing to default.
        assert!(resolver.construct(Fragment::new("counter"), &mut scope).is_err());
    }

    #[test]
    fn test_reconstruct_uses_flakes_handle() {
        let flakes = layout();
        let builder = StructureBuilder::new(StructureProvider::fresh(flakes.clone()));
        let mut hooks = Hooks::new();
        let mut scope = ResolveScope::new(&builder, &mut hooks);

        let memo = json!({"resolver": "flake", "alias": "counter", "name": "my-counter", "handles": ["default"]});
        let request = ComponentRequestContext::new(Snapshot::new(
            memo.as_object().cloned().unwrap_or_default(),
            Default::default(),
        ));

        let fragment = FlakeResolver::new("wire_flakes").reconstruct(&request, &mut scope).unwrap();
        assert_eq!(fragment.name(), "my-counter");
        assert_eq!(fragment.alias(), Some("counter"));
        assert!(builder.is_built(&HandleSet::from(["wire_flakes"])));
        assert_eq!(flakes.generations(), 1);
    }
}
