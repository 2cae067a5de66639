//! Memoized structure builds.
//!
//! A [`Structure`] is the tree of fragments generated from a [`HandleSet`] by
//! an external [`LayoutEngine`]. The [`StructureBuilder`] keys builds by the
//! order-insensitive content hash of the handles so a request generates each
//! distinct handle set at most once.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use wire_cache::{BuildKey, HandleSet};
use wire_core::StructureMode;

use crate::error::{ResolveError, ResolveResult};
use crate::fragment::Fragment;

/// The view-layout engine that turns handles into fragments.
pub trait LayoutEngine: Send {
    /// Load the handles for the next generation, in declaration order.
    fn load_handles(&mut self, handles: &[String]) -> anyhow::Result<()>;

    /// Generate the structure for the loaded handles.
    fn generate_structure(&mut self) -> anyhow::Result<Structure>;
}

/// Creates isolated layout engines.
pub trait LayoutEngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn LayoutEngine>;
}

/// Where layout engines come from.
#[derive(Clone)]
pub enum StructureProvider {
    /// One shared engine; builds are serialized through it.
    Singleton(Arc<Mutex<Box<dyn LayoutEngine>>>),
    /// A new engine per build.
    Fresh(Arc<dyn LayoutEngineFactory>),
}

impl StructureProvider {
    /// Share a single engine.
    pub fn singleton(engine: impl LayoutEngine + 'static) -> Self {
        Self::Singleton(Arc::new(Mutex::new(Box::new(engine))))
    }

    /// Create a fresh engine per build.
    pub fn fresh(factory: impl LayoutEngineFactory + 'static) -> Self {
        Self::Fresh(Arc::new(factory))
    }

    /// Pick the provider variant from configuration.
    pub fn from_config(mode: StructureMode, factory: Arc<dyn LayoutEngineFactory>) -> Self {
        match mode {
            StructureMode::Singleton => Self::Singleton(Arc::new(Mutex::new(factory.create()))),
            StructureMode::Fresh => Self::Fresh(factory),
        }
    }

    /// The configured mode.
    pub fn mode(&self) -> StructureMode {
        match self {
            Self::Singleton(_) => StructureMode::Singleton,
            Self::Fresh(_) => StructureMode::Fresh,
        }
    }

    fn generate(&self, handles: &HandleSet) -> anyhow::Result<Structure> {
        match self {
            Self::Singleton(engine) => {
                let mut engine = engine.lock();
                engine.load_handles(handles.as_slice())?;
                engine.generate_structure()
            }
            Self::Fresh(factory) => {
                let mut engine = factory.create();
                engine.load_handles(handles.as_slice())?;
                engine.generate_structure()
            }
        }
    }
}

impl std::fmt::Debug for StructureProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StructureProvider::{:?}", self.mode())
    }
}

/// A generated tree of fragments.
#[derive(Debug, Clone, Default)]
pub struct Structure {
    handles: HandleSet,
    fragments: IndexMap<String, Fragment>,
}

impl Structure {
    /// Create an empty structure for a handle set.
    pub fn new(handles: HandleSet) -> Self {
        Self {
            handles,
            fragments: IndexMap::new(),
        }
    }

    /// Add a fragment. It is stamped with this structure's handles and
    /// replaces any fragment of the same name.
    pub fn insert(&mut self, mut fragment: Fragment) {
        fragment.set_handles(self.handles.clone());
        self.fragments.insert(fragment.name().to_string(), fragment);
    }

    /// The handles this structure was generated from.
    pub fn handles(&self) -> &HandleSet {
        &self.handles
    }

    /// Look up a fragment by name.
    pub fn fragment(&self, name: &str) -> Option<&Fragment> {
        self.fragments.get(name)
    }

    /// Whether a fragment exists.
    pub fn contains(&self, name: &str) -> bool {
        self.fragments.contains_key(name)
    }

    /// All fragments, in generation order.
    pub fn all_fragments(&self) -> &IndexMap<String, Fragment> {
        &self.fragments
    }

    /// The cache key of a fragment.
    pub fn fragment_cache_key<'a>(&self, fragment: &'a Fragment) -> &'a str {
        fragment.cache_key()
    }

    /// Child fragments of `name`, in declaration order.
    pub fn children(&self, name: &str) -> Vec<&Fragment> {
        let Some(parent) = self.fragments.get(name) else {
            return Vec::new();
        };

        parent
            .children()
            .iter()
            .filter_map(|child| {
                let found = self.fragments.get(child);
                if found.is_none() {
                    tracing::warn!(parent = name, child = child.as_str(), "child fragment missing from structure");
                }
                found
            })
            .collect()
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether the structure has no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

enum BuildSlot {
    Pending,
    Built(Arc<Structure>),
}

/// Request-scoped, memoized structure builds.
pub struct StructureBuilder {
    provider: StructureProvider,
    builds: Mutex<HashMap<BuildKey, BuildSlot>>,
}

impl StructureBuilder {
    /// Create an empty builder.
    pub fn new(provider: StructureProvider) -> Self {
        Self {
            provider,
            builds: Mutex::new(HashMap::new()),
        }
    }

    /// Build or reuse the structure for `handles`.
    ///
    /// Handle sets with equal sorted contents share one build. With `force`
    /// the structure is always regenerated; the cache entry is overwritten
    /// only when generation succeeds.
    pub fn build(&self, handles: &HandleSet, force: bool) -> ResolveResult<Arc<Structure>> {
        let key = handles.build_key();

        let previous = {
            let mut builds = self.builds.lock();
            match builds.get(&key) {
                Some(BuildSlot::Built(structure)) if !force => {
                    tracing::debug!(key = %key, "structure build reused");
                    return Ok(Arc::clone(structure));
                }
                Some(BuildSlot::Pending) => {
                    return Err(ResolveError::structure_build(format!(
                        "build {} is already in progress",
                        key
                    )));
                }
                _ => {}
            }

            // Register before generating so a nested build of the same set cannot recurse.
            builds.insert(key, BuildSlot::Pending)
        };

        tracing::debug!(key = %key, handles = ?handles.as_slice(), force, "building structure");

        match self.provider.generate(handles) {
            Ok(structure) => {
                let structure = Arc::new(structure);
                self.builds
                    .lock()
                    .insert(key, BuildSlot::Built(Arc::clone(&structure)));
                Ok(structure)
            }
            Err(source) => {
                let mut builds = self.builds.lock();
                match previous {
                    // A failed forced rebuild keeps the last good structure.
                    Some(slot @ BuildSlot::Built(_)) => {
                        builds.insert(key, slot);
                    }
                    _ => {
                        builds.remove(&key);
                    }
                }
                Err(ResolveError::StructureBuild {
                    message: format!("could not generate structure for {:?}", handles.as_slice()),
                    source: Some(source),
                })
            }
        }
    }

    /// Always regenerate the structure for `handles`.
    pub fn rebuild(&self, handles: &HandleSet) -> ResolveResult<Arc<Structure>> {
        self.build(handles, true)
    }

    /// Forget every cached build.
    pub fn reset(&self) {
        self.builds.lock().clear();
    }

    /// Whether a finished build exists for `handles`.
    pub fn is_built(&self, handles: &HandleSet) -> bool {
        matches!(
            self.builds.lock().get(&handles.build_key()),
            Some(BuildSlot::Built(_))
        )
    }

    pub fn provider(&self) -> &StructureProvider {
        &self.provider
    }
}

impl std::fmt::Debug for StructureBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructureBuilder")
            .field("provider", &self.provider)
            .field("builds", &self.builds.lock().len())
            .finish()
    }
}
