//! Resolver strategies.
//!
//! A resolver decides whether it applies to a fragment, turns a fragment found
//! during an initial render into a live component, and reconstructs an
//! equivalent fragment from a snapshot during a follow-up request.

mod flake;
mod layout;

pub use flake::*;
pub use layout::*;

use std::fmt;
use std::sync::Arc;

use wire_cache::HandleSet;
use wire_core::{memo_keys, ComponentRequestContext, EngineConfig, Snapshot};

use crate::component::Component;
use crate::context::Hooks;
use crate::error::{ResolveError, ResolveResult};
use crate::fragment::{ComponentRef, Fragment};
use crate::structure::StructureBuilder;

/// Request-scoped collaborators handed to a resolver.
pub struct ResolveScope<'a> {
    builder: &'a StructureBuilder,
    hooks: &'a mut Hooks,
}

impl<'a> ResolveScope<'a> {
    pub fn new(builder: &'a StructureBuilder, hooks: &'a mut Hooks) -> Self {
        Self { builder, hooks }
    }

    pub fn builder(&self) -> &StructureBuilder {
        self.builder
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut *self.hooks
    }
}

impl fmt::Debug for ResolveScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveScope")
            .field("builder", &self.builder)
            .field("hooks", &self.hooks)
            .finish()
    }
}

/// A strategy that turns fragments into components.
pub trait Resolver: Send + Sync + fmt::Debug {
    /// Stable identifier, persisted in the resolver cache and the memo.
    fn accessor(&self) -> &str;

    /// Type identifier recorded as the cache entry's class.
    fn kind(&self) -> &str;

    /// Whether this strategy applies. Must not mutate or build anything.
    fn complies(&self, fragment: &Fragment, hint: Option<&ComponentRef>) -> bool;

    /// Validate and bind the fragment's component.
    fn construct(&self, fragment: Fragment, scope: &mut ResolveScope<'_>) -> ResolveResult<Fragment>;

    /// Handles to rebuild on a follow-up request.
    fn recover_handles(&self, snapshot: &Snapshot) -> HandleSet {
        memo_handles(snapshot)
    }

    /// Locate the fragment described by the snapshot and construct it again.
    fn reconstruct(
        &self,
        request: &ComponentRequestContext,
        scope: &mut ResolveScope<'_>,
    ) -> ResolveResult<Fragment> {
        let snapshot = request.snapshot();
        let alias = snapshot.memo_str(memo_keys::ALIAS);
        let name = snapshot.memo_str(memo_keys::NAME);

        let Some(lookup) = alias.or(name) else {
            return Err(ResolveError::FragmentNotFound(
                "snapshot memo carries neither alias nor name".to_string(),
            ));
        };

        let handles = self.recover_handles(snapshot);
        let structure = scope.builder().build(&handles, false)?;

        // Structures are keyed by declared name, which can differ from the alias.
        let fragment = match structure.fragment(lookup) {
            Some(found) => {
                let mut fragment = found.clone();
                if let Some(alias) = alias {
                    fragment.set_alias(alias);
                    if let Some(name) = name {
                        fragment.set_name(name);
                    }
                }
                fragment
            }
            None => name
                .filter(|name| Some(*name) != alias)
                .and_then(|name| structure.fragment(name))
                .cloned()
                .ok_or_else(|| ResolveError::FragmentNotFound(lookup.to_string()))?,
        };

        self.construct(fragment, scope)
    }

    /// Finalize component identity from its fragment.
    fn assemble(&self, fragment: &Fragment, component: &mut Component) {
        if component.name().is_none() {
            component.set_name(fragment.name());
        }
        if component.id().is_none() {
            component.set_id(fragment.name());
        }
        if component.alias().is_none() {
            component.set_alias(fragment.alias().map(str::to_string));
        }
    }

    /// Whether a probed resolution should be persisted.
    fn remember(&self) -> bool {
        true
    }
}

/// The handles recorded in a snapshot memo, in recorded order.
pub fn memo_handles(snapshot: &Snapshot) -> HandleSet {
    HandleSet::new(snapshot.memo_handles().unwrap_or_default())
}

/// Ordered resolver strategies. Probing walks them in registration order.
#[derive(Debug, Clone, Default)]
pub struct ResolverRegistry {
    strategies: Vec<Arc<dyn Resolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in strategies: flakes first, then layout fragments.
    pub fn defaults(config: &EngineConfig) -> Self {
        Self::new()
            .with(FlakeResolver::new(config.flakes_handle.clone()))
            .with(LayoutResolver::new())
    }

    /// Append a strategy.
    pub fn with(mut self, resolver: impl Resolver + 'static) -> Self {
        self.register(Arc::new(resolver));
        self
    }

    /// Append a shared strategy.
    pub fn register(&mut self, resolver: Arc<dyn Resolver>) {
        if self.by_accessor(resolver.accessor()).is_some() {
            tracing::warn!(accessor = resolver.accessor(), "resolver accessor registered twice; the first wins");
        }
        self.strategies.push(resolver);
    }

    pub fn strategies(&self) -> &[Arc<dyn Resolver>] {
        &self.strategies
    }

    /// The strategy registered under `accessor`.
    pub fn by_accessor(&self, accessor: &str) -> Option<Arc<dyn Resolver>> {
        self.strategies
            .iter()
            .find(|r| r.accessor() == accessor)
            .cloned()
    }

    /// The strategy whose type identifier is `kind`.
    pub fn by_kind(&self, kind: &str) -> Option<Arc<dyn Resolver>> {
        self.strategies.iter().find(|r| r.kind() == kind).cloned()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
