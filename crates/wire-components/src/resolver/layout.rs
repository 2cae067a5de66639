use wire_cache::HandleSet;
use wire_core::{memo_keys, Snapshot};

use super::{memo_handles, ResolveScope, Resolver};
use crate::conditions::Conditions;
use crate::context::{ComponentContext, LifecycleEvent};
use crate::error::{ResolveError, ResolveResult};
use crate::fragment::{ComponentRef, Fragment};

/// Accessor of the layout resolver.
pub const LAYOUT_ACCESSOR: &str = "layout";
/// Type identifier of the layout resolver.
pub const LAYOUT_KIND: &str = "resolver.layout";

/// Where a resolver finds its handles on a follow-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleRecovery {
    /// Handles memorized during dehydrate.
    Memo,
    /// A fixed, resolver-specific set. Nothing is memorized.
    Fixed(HandleSet),
}

/// Resolves template fragments that declare a component.
#[derive(Debug)]
pub struct LayoutResolver {
    accessor: String,
    kind: String,
    conditions: Conditions,
    handles: HandleRecovery,
}

impl LayoutResolver {
    pub fn new() -> Self {
        Self::bare(LAYOUT_ACCESSOR, LAYOUT_KIND).with_conditions(
            Conditions::new()
                .with("template fragment", |fragment, _| fragment.is_template())
                .with("component reference", |_, hint| hint.is_some()),
        )
    }

    /// A layout resolver under another identity, without conditions.
    pub fn bare(accessor: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            accessor: accessor.into(),
            kind: kind.into(),
            conditions: Conditions::new(),
            handles: HandleRecovery::Memo,
        }
    }

    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_handles(mut self, handles: HandleRecovery) -> Self {
        self.handles = handles;
        self
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    /// Whether the handles used are written to the memo.
    pub fn memorizes_handles(&self) -> bool {
        self.handles == HandleRecovery::Memo
    }
}

/// Record the locator memo for components produced by `accessor`.
fn locator_memo(context: &mut ComponentContext<'_>, accessor: &str, memorize: bool) -> anyhow::Result<()> {
    if context.component().resolver_accessor() != Some(accessor) {
        return Ok(());
    }

    if memorize {
        let handles = context
            .component()
            .fragment()
            .map(|fragment| serde_json::to_value(fragment.handles()))
            .transpose()?;
        if let Some(handles) = handles {
            context.add_memo(memo_keys::HANDLES, handles);
        }
    }

    if let Some(alias) = context.component().alias().map(str::to_string) {
        context.add_memo(memo_keys::ALIAS, alias);
    }
    Ok(())
}

impl Default for LayoutResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for LayoutResolver {
    fn accessor(&self) -> &str {
        &self.accessor
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn complies(&self, fragment: &Fragment, hint: Option<&ComponentRef>) -> bool {
        self.conditions.evaluate(fragment, hint)
    }

    fn construct(&self, mut fragment: Fragment, scope: &mut ResolveScope<'_>) -> ResolveResult<Fragment> {
        let component = match fragment.take_component() {
            Some(reference) => reference.into_component().ok_or_else(|| {
                ResolveError::component_not_found(format!(
                    "fragment \"{}\" does not reference a valid component",
                    fragment.name()
                ))
            })?,
            None => {
                return Err(ResolveError::component_not_found(format!(
                    "fragment \"{}\" has no component",
                    fragment.name()
                )))
            }
        };

        fragment.bind_component(component);

        let accessor = self.accessor.clone();
        let memorize = self.memorizes_handles();
        scope.hooks_mut().on(LifecycleEvent::Dehydrate, move |context| {
            locator_memo(context, &accessor, memorize)
        });

        tracing::debug!(fragment = fragment.name(), accessor = %self.accessor, "fragment constructed");
        Ok(fragment)
    }

    fn recover_handles(&self, snapshot: &Snapshot) -> HandleSet {
        match &self.handles {
            HandleRecovery::Memo => memo_handles(snapshot),
            HandleRecovery::Fixed(handles) => handles.clone(),
        }
    }
}
