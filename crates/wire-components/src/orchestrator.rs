//! Request-level orchestration of construct, reconstruct, dehydrate and hydrate.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wire_cache::{KvStore, ResolversCache};
use wire_core::{memo_keys, ComponentRequestContext, EngineConfig, Mode, Snapshot, State};

use crate::arguments::bind_arguments;
use crate::component::Component;
use crate::context::{ComponentContext, Effects, Hooks, LifecycleEvent, Memo};
use crate::error::{ResolveError, ResolveResult};
use crate::flakes::FlakeFactory;
use crate::fragment::{ComponentRef, Fragment};
use crate::manager::ResolverManager;
use crate::resolver::{ResolveScope, Resolver, ResolverRegistry};
use crate::structure::{LayoutEngineFactory, StructureBuilder, StructureProvider};

/// Installs listeners on every request's hooks.
pub type HookInstaller = fn(&mut Hooks);

/// Where a single resolution stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPhase {
    #[default]
    Idle,
    Resolving,
    Constructed,
    Assembled,
    Failed,
}

impl fmt::Display for ResolutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionPhase::Idle => write!(f, "idle"),
            ResolutionPhase::Resolving => write!(f, "resolving"),
            ResolutionPhase::Constructed => write!(f, "constructed"),
            ResolutionPhase::Assembled => write!(f, "assembled"),
            ResolutionPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Outbound state captured by a dehydrate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dehydrated {
    pub memo: Memo,
    pub effects: Effects,
}

impl Dehydrated {
    /// The snapshot a client would send back for `component`.
    pub fn snapshot(&self, component: &Component) -> Snapshot {
        Snapshot::new(self.memo.clone(), component.state().clone())
    }
}

/// Process-wide engine. Shared across requests.
pub struct Engine {
    config: EngineConfig,
    manager: ResolverManager,
    provider: StructureProvider,
    installers: Vec<HookInstaller>,
}

impl Engine {
    /// Create an engine with the built-in resolvers.
    pub fn new(config: EngineConfig, store: Arc<dyn KvStore>, factory: Arc<dyn LayoutEngineFactory>) -> Self {
        let registry = ResolverRegistry::defaults(&config);
        let provider = StructureProvider::from_config(config.structure, factory);
        Self::with_parts(config, registry, store, provider)
    }

    /// Create an engine from explicit parts.
    pub fn with_parts(
        config: EngineConfig,
        registry: ResolverRegistry,
        store: Arc<dyn KvStore>,
        provider: StructureProvider,
    ) -> Self {
        let cache = ResolversCache::new(store, config.resolvers_cache_key.clone());
        Self {
            config,
            manager: ResolverManager::new(registry, cache),
            provider,
            installers: Vec::new(),
        }
    }

    /// Run `installer` against the hooks of every request.
    pub fn with_hooks(mut self, installer: HookInstaller) -> Self {
        self.installers.push(installer);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn manager(&self) -> &ResolverManager {
        &self.manager
    }

    pub fn provider(&self) -> &StructureProvider {
        &self.provider
    }

    /// Begin a request.
    pub fn request(&self, mode: Mode) -> ResolveResult<Orchestrator<'_>> {
        let mut state = State::new();
        state.start()?.set_mode(mode);

        let mut hooks = Hooks::new();
        hooks.on(LifecycleEvent::Dehydrate, identity_memo);
        for installer in &self.installers {
            installer(&mut hooks);
        }

        tracing::debug!(mode = %state.mode(), "request started");

        Ok(Orchestrator {
            engine: self,
            state,
            builder: StructureBuilder::new(self.provider.clone()),
            hooks,
            phase: ResolutionPhase::Idle,
        })
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("manager", &self.manager)
            .field("provider", &self.provider)
            .field("installers", &self.installers.len())
            .finish()
    }
}

fn identity_memo(context: &mut ComponentContext<'_>) -> anyhow::Result<()> {
    let component = context.component();
    let accessor = component.resolver_accessor().map(str::to_string);
    let name = component.name().map(str::to_string);
    let id = component.id().map(str::to_string);

    if let Some(accessor) = accessor {
        context.add_memo(memo_keys::RESOLVER, accessor);
    }
    if let Some(name) = name {
        context.add_memo(memo_keys::NAME, name);
    }
    if let Some(id) = id {
        context.add_memo(memo_keys::ID, id);
    }
    Ok(())
}

/// Per-request resolution driver.
pub struct Orchestrator<'e> {
    engine: &'e Engine,
    state: State,
    builder: StructureBuilder,
    hooks: Hooks,
    phase: ResolutionPhase,
}

impl<'e> Orchestrator<'e> {
    pub fn phase(&self) -> ResolutionPhase {
        self.phase
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn builder(&self) -> &StructureBuilder {
        &self.builder
    }

    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// Register a listener for this request.
    pub fn on<F>(&mut self, event: LifecycleEvent, listener: F) -> &mut Self
    where
        F: Fn(&mut ComponentContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.on(event, listener);
        self
    }

    /// Flake factory over this request's structure builds.
    pub fn flakes(&self) -> FlakeFactory<'_> {
        FlakeFactory::new(&self.builder, self.engine.config.flakes_handle.clone())
    }

    /// Initial render: pick a resolver for `fragment` and build its component.
    pub fn resolve_and_construct(&mut self, fragment: Fragment) -> ResolveResult<Component> {
        self.transition(ResolutionPhase::Resolving);
        let outcome = self.construct(fragment);
        self.settle(outcome)
    }

    /// Follow-up request: rebuild the component described by the snapshot.
    pub fn resolve_and_reconstruct(&mut self, request: &ComponentRequestContext) -> ResolveResult<Component> {
        self.transition(ResolutionPhase::Resolving);
        let outcome = self.reconstruct(request);
        self.settle(outcome)
    }

    /// Capture the memo and effects to send out.
    pub fn dehydrate(&self, component: &mut Component) -> ResolveResult<Dehydrated> {
        let mut context = ComponentContext::new(component);
        self.hooks
            .fire(LifecycleEvent::Dehydrate, &mut context)
            .map_err(|source| listener_failure(LifecycleEvent::Dehydrate, source))?;

        let (memo, effects) = context.into_parts();
        Ok(Dehydrated { memo, effects })
    }

    /// Restore inbound snapshot state onto `component`.
    pub fn hydrate(&self, component: &mut Component, snapshot: &Snapshot) -> ResolveResult<()> {
        component
            .state_mut()
            .extend(snapshot.data.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut context = ComponentContext::new(component).with_memo(snapshot.memo.clone());
        self.hooks
            .fire(LifecycleEvent::Hydrate, &mut context)
            .map_err(|source| listener_failure(LifecycleEvent::Hydrate, source))
    }

    fn construct(&mut self, fragment: Fragment) -> ResolveResult<Component> {
        let resolver = self.engine.manager.resolve(&fragment)?;

        let mut scope = ResolveScope::new(&self.builder, &mut self.hooks);
        let fragment = resolver.construct(fragment, &mut scope)?;
        self.transition(ResolutionPhase::Constructed);

        self.finish(resolver, fragment, None)
    }

    fn reconstruct(&mut self, request: &ComponentRequestContext) -> ResolveResult<Component> {
        let snapshot = request.snapshot();
        let accessor = snapshot.memo_str(memo_keys::RESOLVER).ok_or_else(|| {
            ResolveError::ResolverNotFound("snapshot memo carries no resolver accessor".to_string())
        })?;
        let resolver = self.engine.manager.instantiate(accessor)?;

        let mut scope = ResolveScope::new(&self.builder, &mut self.hooks);
        let fragment = resolver.reconstruct(request, &mut scope)?;
        self.transition(ResolutionPhase::Constructed);

        self.finish(resolver, fragment, Some(snapshot))
    }

    fn finish(
        &mut self,
        resolver: Arc<dyn Resolver>,
        mut fragment: Fragment,
        snapshot: Option<&Snapshot>,
    ) -> ResolveResult<Component> {
        let mut component = fragment
            .take_component()
            .and_then(ComponentRef::into_component)
            .ok_or_else(|| {
                ResolveError::component_not_found(format!("fragment \"{}\" lost its component", fragment.name()))
            })?;

        bind_arguments(&fragment, &mut component);

        let event = match snapshot {
            Some(snapshot) => {
                if let Some(id) = snapshot.memo_str(memo_keys::ID) {
                    component.set_id(id);
                }
                LifecycleEvent::Reconstruct
            }
            None => {
                component.mount().map_err(|source| ResolveError::ComponentNotFound {
                    message: format!("component of fragment \"{}\" failed to mount", fragment.name()),
                    source: Some(source),
                })?;
                LifecycleEvent::Construct
            }
        };

        component.set_resolver(Arc::clone(&resolver));
        resolver.assemble(&fragment, &mut component);
        component.set_fragment(fragment);

        let mut context = ComponentContext::new(&mut component);
        self.hooks
            .fire(event, &mut context)
            .map_err(|source| listener_failure(event, source))?;

        Ok(component)
    }

    fn settle(&mut self, outcome: ResolveResult<Component>) -> ResolveResult<Component> {
        match &outcome {
            Ok(_) => self.transition(ResolutionPhase::Assembled),
            Err(err) => {
                tracing::debug!(error = %err, "resolution failed");
                self.transition(ResolutionPhase::Failed);
            }
        }
        outcome
    }

    fn transition(&mut self, phase: ResolutionPhase) {
        tracing::debug!(from = %self.phase, to = %phase, "resolution phase");
        self.phase = phase;
    }
}

impl fmt::Debug for Orchestrator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("mode", &self.state.mode())
            .field("phase", &self.phase)
            .field("builder", &self.builder)
            .field("hooks", &self.hooks)
            .finish()
    }
}

fn listener_failure(event: LifecycleEvent, source: anyhow::Error) -> ResolveError {
    ResolveError::ComponentNotFound {
        message: format!("{} listeners failed", event),
        source: Some(source),
    }
}
