//! Stateful components.

use std::fmt::Debug;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::fragment::Fragment;
use crate::resolver::Resolver;

/// Business logic behind a component.
pub trait ComponentLogic: Send + Sync + Debug {
    /// Stable type name of the logic.
    fn type_name(&self) -> &str;

    /// Called once on initial render, after arguments are bound.
    fn mount(&self, _params: &Map<String, Value>, _state: &mut Map<String, Value>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A stateful unit attached to a fragment.
///
/// Never persisted directly; only its memo survives a request.
#[derive(Debug, Clone)]
pub struct Component {
    name: Option<String>,
    id: Option<String>,
    alias: Option<String>,
    logic: Arc<dyn ComponentLogic>,
    state: Map<String, Value>,
    mount_params: Map<String, Value>,
    resolver: Option<Arc<dyn Resolver>>,
    fragment: Option<Box<Fragment>>,
}

impl Component {
    /// Create a component around its logic.
    pub fn new(logic: Arc<dyn ComponentLogic>) -> Self {
        Self {
            name: None,
            id: None,
            alias: None,
            logic,
            state: Map::new(),
            mount_params: Map::new(),
            resolver: None,
            fragment: None,
        }
    }

    /// Set the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn set_alias(&mut self, alias: Option<String>) {
        self.alias = alias;
    }

    pub fn logic(&self) -> &Arc<dyn ComponentLogic> {
        &self.logic
    }

    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.state
    }

    pub fn mount_params(&self) -> &Map<String, Value> {
        &self.mount_params
    }

    pub fn mount_params_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.mount_params
    }

    /// Run the logic's mount step against this component's state.
    pub fn mount(&mut self) -> anyhow::Result<()> {
        let logic = Arc::clone(&self.logic);
        logic.mount(&self.mount_params, &mut self.state)
    }

    /// The resolver that produced this component.
    pub fn resolver(&self) -> Option<&Arc<dyn Resolver>> {
        self.resolver.as_ref()
    }

    /// Accessor of the producing resolver.
    pub fn resolver_accessor(&self) -> Option<&str> {
        self.resolver.as_ref().map(|r| r.accessor())
    }

    pub fn set_resolver(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolver = Some(resolver);
    }

    /// The fragment hosting this component.
    pub fn fragment(&self) -> Option<&Fragment> {
        self.fragment.as_deref()
    }

    pub fn fragment_mut(&mut self) -> Option<&mut Fragment> {
        self.fragment.as_deref_mut()
    }

    pub fn set_fragment(&mut self, fragment: Fragment) {
        self.fragment = Some(Box::new(fragment));
    }
}
