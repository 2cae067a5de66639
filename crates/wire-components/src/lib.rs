//! Component resolution and cross-request rehydration.
//!
//! This crate provides:
//! - `Fragment` / `Component` - Renderable nodes and the stateful units they host
//! - `StructureBuilder` - Memoized structure builds keyed by handle-set content
//! - `Resolver` - Strategies turning fragments into components (`layout`, `flake`)
//! - `ResolverManager` - Override, then cache, then probe resolver selection
//! - `ComponentContext` / `Hooks` - Memo, effects and lifecycle listeners
//! - `Engine` / `Orchestrator` - Construct, reconstruct, dehydrate and hydrate flows
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wire_cache::MemoryStore;
//! use wire_components::{ComponentRef, Engine, Fragment, MemoryLayout};
//! use wire_core::{ComponentRequestContext, EngineConfig, Mode};
//!
//! let layout = MemoryLayout::new();
//! layout.define("default", Fragment::new("widget.foo").with_component(ComponentRef::Instance(widget)));
//!
//! let engine = Engine::new(EngineConfig::default(), Arc::new(MemoryStore::new()), Arc::new(layout));
//!
//! // Initial render
//! let mut render = engine.request(Mode::Preceding)?;
//! let mut component = render.resolve_and_construct(fragment)?;
//! let snapshot = render.dehydrate(&mut component)?.snapshot(&component);
//!
//! // Follow-up request
//! let mut update = engine.request(Mode::Subsequent)?;
//! let component = update.resolve_and_reconstruct(&ComponentRequestContext::new(snapshot))?;
//! ```

mod arguments;
mod component;
mod conditions;
mod context;
mod error;
mod fragment;
mod manager;
mod memory;
mod orchestrator;
mod structure;
mod tags;

pub mod compat;
pub mod flakes;
pub mod resolver;

pub use arguments::bind_arguments;
pub use component::{Component, ComponentLogic};
pub use conditions::Conditions;
pub use context::*;
pub use error::{ResolveError, ResolveResult};
pub use fragment::{data_keys, ComponentRef, Fragment, FragmentKind};
pub use manager::ResolverManager;
pub use memory::{MemoryLayout, MemoryLayoutEngine};
pub use orchestrator::*;
pub use resolver::{FlakeResolver, LayoutResolver, ResolveScope, Resolver, ResolverRegistry};
pub use structure::*;
pub use tags::Tags;
