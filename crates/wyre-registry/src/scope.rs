//! The scope tree.
//!
//! # Design
//!
//! Scopes form a tree with one-way visibility: a node resolves keys
//! against its own explicit bindings first, then walks to the root. A
//! parent never sees a child's bindings — but it must also never
//! *synthesize* a binding for a key a child has bound explicitly, or two
//! conflicting instances of the "same" dependency would exist in one
//! tree. Registration therefore bans the key at every ancestor, and the
//! ban lives exactly as long as the declaring node: dropping the last
//! handle to a scope retracts its contributions synchronously.
//!
//! Shared per-tree state (ban table, singleton slots, id counters,
//! configuration, the synthesis provider and provision listeners) hangs
//! off a [`ScopeTree`] that every node holds an `Arc` to. The JIT cache
//! is per node and insert-if-absent, so synthesis races need no lock
//! beyond the cache's own sharding.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use dashmap::DashMap;
use indexmap::IndexMap;
use tracing::{debug, trace};

use wyre_common::{BindingError, EngineConfig, Key, Source};

use crate::bans::BanTable;
use crate::binding::{Binding, FactoryId, ScopeKind};
use crate::recipe::{ConstructionRecipe, JitRecipeProvider, ProvisionListener};
use crate::singleton::SingletonTable;

/// Identifies one node within its scope tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ScopeId(pub u32);

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Why a lookup could not produce a binding. Mapped to the public error
/// taxonomy by the resolver, which owns the dependency-chain context.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum LookupFailure {
    /// No explicit binding and no synthesis path.
    Missing,
    /// Synthesis was requested for a key a descendant owns exclusively.
    Banned,
}

/// Shared state for one scope tree.
pub struct ScopeTree {
    config: EngineConfig,
    next_factory: AtomicU32,
    next_scope: AtomicU32,
    bans: Mutex<BanTable>,
    singletons: SingletonTable,
    jit_provider: Option<Arc<dyn JitRecipeProvider>>,
    listeners: Vec<Arc<dyn ProvisionListener>>,
}

impl ScopeTree {
    /// Start building a tree. `build()` returns the root [`Scope`].
    pub fn builder() -> ScopeTreeBuilder {
        ScopeTreeBuilder::new()
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn singletons(&self) -> &SingletonTable {
        &self.singletons
    }

    #[inline]
    pub fn listeners(&self) -> &[Arc<dyn ProvisionListener>] {
        &self.listeners
    }

    fn allocate_factory(&self) -> FactoryId {
        let id = FactoryId(self.next_factory.fetch_add(1, Ordering::Relaxed));
        trace!(target: "wyre::registry", factory = %id, "allocated factory id");
        id
    }

    fn allocate_scope(&self) -> ScopeId {
        ScopeId(self.next_scope.fetch_add(1, Ordering::Relaxed))
    }

    /// Lifecycle hook: a child scope became unreachable. Retracts exactly
    /// that child's ban contributions. Invoked from the node's `Drop`;
    /// hosts managing lifetimes by hand may call it through
    /// [`Scope::close`].
    pub fn on_child_scope_dropped(&self, child: ScopeId) {
        let removed = self
            .bans
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retract_contributor(child);
        if removed > 0 {
            debug!(
                target: "wyre::scope",
                scope = %child,
                retracted = removed,
                "child scope dropped; bans retracted"
            );
        }
    }
}

/// Configures and creates a scope tree.
pub struct ScopeTreeBuilder {
    config: EngineConfig,
    jit_provider: Option<Arc<dyn JitRecipeProvider>>,
    listeners: Vec<Arc<dyn ProvisionListener>>,
}

impl ScopeTreeBuilder {
    fn new() -> Self {
        Self {
            config: EngineConfig::new(),
            jit_provider: None,
            listeners: Vec::new(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn jit_provider(mut self, provider: Arc<dyn JitRecipeProvider>) -> Self {
        self.jit_provider = Some(provider);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn ProvisionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Create the tree and return its root scope.
    pub fn build(self) -> Scope {
        let tree = Arc::new(ScopeTree {
            config: self.config,
            next_factory: AtomicU32::new(0),
            next_scope: AtomicU32::new(0),
            bans: Mutex::new(BanTable::default()),
            singletons: SingletonTable::new(),
            jit_provider: self.jit_provider,
            listeners: self.listeners,
        });
        let id = tree.allocate_scope();
        debug!(target: "wyre::scope", scope = %id, "created root scope");
        Scope {
            node: Arc::new(ScopeNode {
                id,
                tree,
                parent: None,
                explicit: RwLock::new(IndexMap::new()),
                jit_cache: DashMap::new(),
            }),
        }
    }
}

/// One level of the scope tree.
///
/// Held behind an `Arc`; dropping the last reference retracts the node's
/// ban contributions from every ancestor.
pub struct ScopeNode {
    id: ScopeId,
    tree: Arc<ScopeTree>,
    parent: Option<Arc<ScopeNode>>,
    /// Explicit bindings, in declaration order.
    explicit: RwLock<IndexMap<Key, Arc<Binding>>>,
    /// Bindings synthesized on demand at this node. Insert-if-absent;
    /// racing synthesizers are fine, the first publish wins.
    jit_cache: DashMap<Key, Arc<Binding>>,
}

impl ScopeNode {
    #[inline]
    pub fn id(&self) -> ScopeId {
        self.id
    }

    #[inline]
    pub fn tree(&self) -> &Arc<ScopeTree> {
        &self.tree
    }

    #[inline]
    pub fn parent(&self) -> Option<&Arc<ScopeNode>> {
        self.parent.as_ref()
    }

    /// Number of explicit bindings declared at this node.
    pub fn bindings_len(&self) -> usize {
        self.explicit.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Is `key` banned at this node by a live descendant?
    pub fn is_banned(&self, key: &Key) -> bool {
        self.tree
            .bans
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_banned(self.id, key)
    }

    /// Register an explicit binding at this node.
    pub fn register(
        &self,
        key: Key,
        recipe: Arc<dyn ConstructionRecipe>,
        scope: ScopeKind,
        source: Source,
    ) -> Result<(), BindingError> {
        if let Some(existing) = self
            .explicit
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Err(BindingError::DuplicateBinding {
                key,
                existing: existing.source(),
                duplicate: source,
            });
        }

        // A live descendant owns this key exclusively.
        if self.is_banned(&key) {
            return Err(BindingError::ConflictingChildBinding {
                key,
                declared_at: source,
            });
        }

        // A synthesized binding is already live at or above this node;
        // shadowing it now would split the key's identity.
        let mut ancestor = Some(self);
        while let Some(node) = ancestor {
            if node.jit_cache.contains_key(&key) {
                return Err(BindingError::ConflictingChildBinding {
                key,
                declared_at: source,
            });
            }
            ancestor = node.parent.as_deref();
        }

        let factory_id = self.tree.allocate_factory();
        let binding = Arc::new(Binding::new(
            key.clone(),
            scope,
            recipe,
            source,
            factory_id,
            false,
        ));

        {
            let mut explicit = self.explicit.write().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = explicit.get(&key) {
                return Err(BindingError::DuplicateBinding {
                    key,
                    existing: existing.source(),
                    duplicate: source,
                });
            }
            explicit.insert(key.clone(), binding);
        }

        // Ban the key root-ward so no ancestor synthesizes it later.
        if self.parent.is_some() {
            let mut bans = self.tree.bans.lock().unwrap_or_else(|e| e.into_inner());
            let mut ancestor = self.parent.as_deref();
            while let Some(node) = ancestor {
                bans.add(node.id, &key, self.id, source);
                ancestor = node.parent.as_deref();
            }
        }

        debug!(
            target: "wyre::registry",
            scope = %self.id,
            key = %key,
            factory = %factory_id,
            kind = ?scope,
            "registered binding"
        );
        Ok(())
    }

    /// First explicit match, searching this node then its ancestors.
    /// Returns the binding together with the node that owns it, because
    /// the owner is where the binding's own dependencies resolve.
    pub fn lookup(self: &Arc<Self>, key: &Key) -> Option<(Arc<Binding>, Arc<ScopeNode>)> {
        let mut node = self.clone();
        loop {
            if let Some(binding) = node
                .explicit
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .get(key)
            {
                return Some((binding.clone(), node.clone()));
            }
            let parent = node.parent.clone();
            match parent {
                Some(parent) => node = parent,
                None => return None,
            }
        }
    }

    /// Explicit chain, then this node's JIT cache, then synthesis when
    /// permitted and the key is not banned at or above this node.
    pub fn lookup_or_synthesize(
        self: &Arc<Self>,
        key: &Key,
    ) -> Result<(Arc<Binding>, Arc<ScopeNode>), LookupFailure> {
        if let Some(found) = self.lookup(key) {
            return Ok(found);
        }
        if let Some(cached) = self.jit_cache.get(key) {
            return Ok((cached.clone(), self.clone()));
        }
        if !self.tree.config.jit_allowed {
            return Err(LookupFailure::Missing);
        }

        {
            let bans = self.tree.bans.lock().unwrap_or_else(|e| e.into_inner());
            let mut node = Some(self.as_ref());
            while let Some(current) = node {
                if bans.is_banned(current.id, key) {
                    return Err(LookupFailure::Banned);
                }
                node = current.parent.as_deref();
            }
        }

        let provider = self.tree.jit_provider.as_ref().ok_or(LookupFailure::Missing)?;
        let jit = provider.recipe_for(key).ok_or(LookupFailure::Missing)?;

        let binding = self
            .jit_cache
            .entry(key.clone())
            .or_insert_with(|| {
                let factory_id = self.tree.allocate_factory();
                trace!(
                    target: "wyre::registry",
                    scope = %self.id,
                    key = %key,
                    factory = %factory_id,
                    "synthesized binding"
                );
                Arc::new(Binding::new(
                    key.clone(),
                    jit.scope,
                    jit.recipe,
                    Source::unknown(),
                    factory_id,
                    true,
                ))
            })
            .clone();
        Ok((binding, self.clone()))
    }
}

impl Drop for ScopeNode {
    fn drop(&mut self) {
        if self.parent.is_some() {
            self.tree.on_child_scope_dropped(self.id);
        }
    }
}

impl fmt::Debug for ScopeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeNode")
            .field("id", &self.id)
            .field("parent", &self.parent.as_ref().map(|p| p.id))
            .field("bindings", &self.bindings_len())
            .finish_non_exhaustive()
    }
}

/// Cloneable handle to a scope node. The node (and its ban contributions)
/// lives as long as any handle or descendant references it.
#[derive(Clone, Debug)]
pub struct Scope {
    node: Arc<ScopeNode>,
}

impl Scope {
    #[inline]
    pub fn node(&self) -> &Arc<ScopeNode> {
        &self.node
    }

    #[inline]
    pub fn id(&self) -> ScopeId {
        self.node.id
    }

    #[inline]
    pub fn tree(&self) -> &Arc<ScopeTree> {
        &self.node.tree
    }

    /// Create a child scope. The child sees this scope's bindings; this
    /// scope never sees the child's.
    pub fn child(&self) -> Scope {
        let id = self.node.tree.allocate_scope();
        debug!(
            target: "wyre::scope",
            scope = %id,
            parent = %self.node.id,
            "created child scope"
        );
        Scope {
            node: Arc::new(ScopeNode {
                id,
                tree: self.node.tree.clone(),
                parent: Some(self.node.clone()),
                explicit: RwLock::new(IndexMap::new()),
                jit_cache: DashMap::new(),
            }),
        }
    }

    /// Register an explicit binding at this scope.
    pub fn register(
        &self,
        key: Key,
        recipe: Arc<dyn ConstructionRecipe>,
        scope: ScopeKind,
        source: Source,
    ) -> Result<(), BindingError> {
        self.node.register(key, recipe, scope, source)
    }

    /// [`register`](Self::register) with the caller's location as source.
    #[track_caller]
    pub fn bind(
        &self,
        key: Key,
        recipe: Arc<dyn ConstructionRecipe>,
        scope: ScopeKind,
    ) -> Result<(), BindingError> {
        self.node.register(key, recipe, scope, Source::here())
    }

    /// Drop this handle explicitly. Ban retraction happens when the node
    /// itself becomes unreachable (no handles, no live descendants).
    pub fn close(self) {
        drop(self);
    }
}
