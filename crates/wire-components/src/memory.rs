//! In-memory layout engine.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use indexmap::IndexMap;
use parking_lot::RwLock;
use wire_cache::HandleSet;

use crate::fragment::Fragment;
use crate::structure::{LayoutEngine, LayoutEngineFactory, Structure};

#[derive(Debug, Default)]
struct LayoutTable {
    definitions: RwLock<IndexMap<String, Vec<Fragment>>>,
    generations: AtomicUsize,
    strict: AtomicBool,
}

/// A handle → fragments table that generates structures.
///
/// Clones share the same table, so a layout can be handed to a provider and
/// still be inspected afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayout {
    table: Arc<LayoutTable>,
}

impl MemoryLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail generation when a loaded handle has no definitions.
    pub fn with_strict(self, strict: bool) -> Self {
        self.table.strict.store(strict, Ordering::Relaxed);
        self
    }

    /// Declare a fragment under `handle`.
    pub fn define(&self, handle: impl Into<String>, fragment: Fragment) -> &Self {
        self.table
            .definitions
            .write()
            .entry(handle.into())
            .or_default()
            .push(fragment);
        self
    }

    /// Whether `handle` has definitions.
    pub fn is_defined(&self, handle: &str) -> bool {
        self.table.definitions.read().contains_key(handle)
    }

    /// How many structures have been generated.
    pub fn generations(&self) -> usize {
        self.table.generations.load(Ordering::SeqCst)
    }

    /// A standalone engine over this table.
    pub fn engine(&self) -> MemoryLayoutEngine {
        MemoryLayoutEngine {
            layout: self.clone(),
            handles: Vec::new(),
        }
    }
}

impl LayoutEngineFactory for MemoryLayout {
    fn create(&self) -> Box<dyn LayoutEngine> {
        Box::new(self.engine())
    }
}

/// Engine instance produced by [`MemoryLayout`].
#[derive(Debug)]
pub struct MemoryLayoutEngine {
    layout: MemoryLayout,
    handles: Vec<String>,
}

impl LayoutEngine for MemoryLayoutEngine {
    fn load_handles(&mut self, handles: &[String]) -> anyhow::Result<()> {
        self.handles = handles.to_vec();
        Ok(())
    }

    fn generate_structure(&mut self) -> anyhow::Result<Structure> {
        let table = &self.layout.table;
        table.generations.fetch_add(1, Ordering::SeqCst);

        let strict = table.strict.load(Ordering::Relaxed);
        let definitions = table.definitions.read();
        let mut structure = Structure::new(HandleSet::new(self.handles.clone()));

        for handle in &self.handles {
            match definitions.get(handle) {
                Some(fragments) => {
                    for fragment in fragments {
                        structure.insert(fragment.clone());
                    }
                }
                None if strict => bail!("layout handle \"{}\" is not defined", handle),
                None => {}
            }
        }

        Ok(structure)
    }
}
