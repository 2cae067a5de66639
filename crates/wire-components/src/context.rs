//! Component context: memo, effects and lifecycle listeners.

use std::collections::HashMap;
use std::fmt;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::component::Component;

/// State persisted into the next request's snapshot.
pub type Memo = Map<String, Value>;

/// Transient, client-bound state. Never round-tripped back.
pub type Effects = Map<String, Value>;

/// Lifecycle events listeners can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
    /// A component was constructed during an initial render.
    Construct,
    /// A component was reconstructed from a snapshot.
    Reconstruct,
    /// Inbound snapshot state is being restored.
    Hydrate,
    /// Outbound memo and effects are being captured.
    Dehydrate,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Construct => write!(f, "construct"),
            LifecycleEvent::Reconstruct => write!(f, "reconstruct"),
            LifecycleEvent::Hydrate => write!(f, "hydrate"),
            LifecycleEvent::Dehydrate => write!(f, "dehydrate"),
        }
    }
}

/// The mutable view a listener receives.
pub struct ComponentContext<'a> {
    component: &'a mut Component,
    memo: Memo,
    effects: Effects,
}

impl<'a> ComponentContext<'a> {
    /// Create an empty context for a component.
    pub fn new(component: &'a mut Component) -> Self {
        Self {
            component,
            memo: Memo::new(),
            effects: Effects::new(),
        }
    }

    /// Seed the memo, e.g. from an inbound snapshot.
    pub fn with_memo(mut self, memo: Memo) -> Self {
        self.memo = memo;
        self
    }

    pub fn component(&self) -> &Component {
        &*self.component
    }

    pub fn component_mut(&mut self) -> &mut Component {
        &mut *self.component
    }

    pub fn memo(&self) -> &Memo {
        &self.memo
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    /// Set a memo entry, overwriting any previous value.
    pub fn add_memo(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.memo.insert(key.into(), value.into());
    }

    /// Append to a memo entry, or set `entry[index]` when an index key is given.
    pub fn push_memo(&mut self, key: &str, value: impl Into<Value>, index: Option<&str>) {
        push_into(&mut self.memo, key, value.into(), index);
    }

    /// Set an effect, overwriting any previous value.
    pub fn add_effect(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.effects.insert(key.into(), value.into());
    }

    /// Append to an effect, or set `entry[index]` when an index key is given.
    pub fn push_effect(&mut self, key: &str, value: impl Into<Value>, index: Option<&str>) {
        push_into(&mut self.effects, key, value.into(), index);
    }

    pub fn has_effect(&self, key: &str) -> bool {
        self.effects.contains_key(key)
    }

    pub fn effect(&self, key: &str) -> Option<&Value> {
        self.effects.get(key)
    }

    /// Release the captured memo and effects.
    pub fn into_parts(self) -> (Memo, Effects) {
        (self.memo, self.effects)
    }
}

impl fmt::Debug for ComponentContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentContext")
            .field("component", &self.component.name())
            .field("memo", &self.memo)
            .field("effects", &self.effects)
            .finish()
    }
}

fn push_into(map: &mut Map<String, Value>, key: &str, value: Value, index: Option<&str>) {
    let entry = map.entry(key.to_string()).or_insert(Value::Null);

    match index {
        Some(index) => {
            if !entry.is_object() {
                let mut object = Map::new();
                if let Value::Array(items) = entry.take() {
                    for (position, item) in items.into_iter().enumerate() {
                        object.insert(position.to_string(), item);
                    }
                }
                *entry = Value::Object(object);
            }
            if let Value::Object(object) = entry {
                object.insert(index.to_string(), value);
            }
        }
        None => match entry {
            Value::Array(items) => items.push(value),
            Value::Object(object) => {
                // Continue numbering after the largest numeric key.
                let next = object
                    .keys()
                    .filter_map(|k| k.parse::<usize>().ok())
                    .max()
                    .map_or(0, |n| n + 1);
                object.insert(next.to_string(), value);
            }
            scalar => *scalar = Value::Array(vec![value]),
        },
    }
}

/// A lifecycle listener.
pub type Listener = Box<dyn Fn(&mut ComponentContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Ordered listeners per lifecycle event.
#[derive(Default)]
pub struct Hooks {
    listeners: HashMap<LifecycleEvent, Vec<Listener>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Listeners run in registration order.
    pub fn on<F>(&mut self, event: LifecycleEvent, listener: F) -> &mut Self
    where
        F: Fn(&mut ComponentContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners.entry(event).or_default().push(Box::new(listener));
        self
    }

    /// Run every listener for `event`, stopping at the first failure.
    pub fn fire(&self, event: LifecycleEvent, context: &mut ComponentContext<'_>) -> anyhow::Result<()> {
        let Some(listeners) = self.listeners.get(&event) else {
            return Ok(());
        };

        for (position, listener) in listeners.iter().enumerate() {
            listener(context).with_context(|| format!("{} listener #{} failed", event, position))?;
        }
        Ok(())
    }

    /// Number of listeners registered for `event`.
    pub fn count(&self, event: LifecycleEvent) -> usize {
        self.listeners.get(&event).map_or(0, Vec::len)
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (event, listeners) in &self.listeners {
            map.entry(event, &listeners.len());
        }
        map.finish()
    }
}
