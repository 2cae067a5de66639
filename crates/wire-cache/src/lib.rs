//! Advisory key-value persistence for the component resolution engine.
//!
//! This crate provides:
//! - `KvStore` - The byte-level persistence contract (`get`/`set`)
//! - `MemoryStore` - Thread-safe in-memory store
//! - `Cache` - Typed JSON wrapper over any store
//! - `ResolversCache` - The long-lived fragment → resolver mapping
//! - `HandleSet` / `BuildKey` - Order-insensitive structure build keys
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wire_cache::{HandleSet, MemoryStore, ResolversCache};
//!
//! let store = Arc::new(MemoryStore::new());
//! let cache = ResolversCache::new(store, "wire_resolvers");
//!
//! let mut document = cache.fetch()?;
//! document.remember("blk1", "widget.foo", "layout", "resolver.layout");
//! cache.save(&document)?;
//!
//! let a = HandleSet::from(["default", "page_layout"]);
//! let b = HandleSet::from(["page_layout", "default"]);
//! assert_eq!(a.build_key(), b.build_key());
//! ```

mod error;
mod key;
mod resolvers;
mod store;

pub use error::CacheError;
pub use key::*;
pub use resolvers::*;
pub use store::*;
