//! The construction capability supplied by the host.
//!
//! The runtime never inspects language-level type metadata. Everything it
//! needs to build an instance arrives through [`ConstructionRecipe`]: the
//! dependency list (each edge tagged with its injection stage), a
//! two-phase build (construct with constructor-stage dependencies, then
//! inject member-stage dependencies into the minimally-constructed
//! instance), and a delegation capability used to decide whether a cycle
//! through this recipe may be bridged with a deferred handle.

use wyre_common::{Handle, InjectStage, Instance, Key, ProvisionFault, Source};

use crate::binding::ScopeKind;

/// One dependency edge declared by a recipe.
#[derive(Clone, Debug)]
pub struct DependencyRequest {
    key: Key,
    stage: InjectStage,
    allow_absent: bool,
}

impl DependencyRequest {
    /// A constructor argument. Must resolve to a real instance before the
    /// dependent can be built; cycles through this edge are fatal.
    pub fn constructor(key: Key) -> Self {
        Self {
            key,
            stage: InjectStage::Constructor,
            allow_absent: false,
        }
    }

    /// A member injected after minimal construction.
    pub fn member(key: Key) -> Self {
        Self {
            key,
            stage: InjectStage::Member,
            allow_absent: false,
        }
    }

    /// Permit the provider to produce no instance for this edge.
    pub fn allowing_absent(mut self) -> Self {
        self.allow_absent = true;
        self
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn stage(&self) -> InjectStage {
        self.stage
    }

    #[inline]
    pub fn allow_absent(&self) -> bool {
        self.allow_absent
    }
}

/// A dependency resolved for one stage of a recipe.
#[derive(Clone, Debug)]
pub struct ResolvedDep {
    key: Key,
    handle: Option<Handle>,
}

impl ResolvedDep {
    pub fn new(key: Key, handle: Option<Handle>) -> Self {
        Self { key, handle }
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// `None` when the edge permitted absence and the provider produced
    /// no instance.
    #[inline]
    pub fn handle(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    /// Shortcut: the resolved instance, if present and not deferred.
    pub fn instance(&self) -> Option<Instance> {
        self.handle.as_ref().and_then(Handle::resolve)
    }
}

/// The dependencies resolved for one stage, in declaration order.
#[derive(Default, Debug)]
pub struct ResolvedSet {
    entries: Vec<ResolvedDep>,
}

impl ResolvedSet {
    pub fn new(entries: Vec<ResolvedDep>) -> Self {
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&ResolvedDep> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedDep> {
        self.entries.iter()
    }

    /// Look a dependency up by key.
    pub fn by_key(&self, key: &Key) -> Option<&ResolvedDep> {
        self.entries.iter().find(|dep| dep.key() == key)
    }
}

/// How to build an instance given resolved dependencies.
///
/// Implementations are supplied by the binding/builder layer; the runtime
/// only ever calls through this trait.
pub trait ConstructionRecipe: Send + Sync {
    /// Every dependency edge, constructor- and member-stage together, in
    /// the order the stages' [`ResolvedSet`]s will present them.
    fn dependencies(&self) -> &[DependencyRequest];

    /// Build the instance from constructor-stage dependencies.
    ///
    /// Returning `Ok(None)` means the recipe deliberately produced no
    /// instance; the requesting edge decides whether that is legal.
    fn construct(&self, deps: &ResolvedSet) -> Result<Option<Instance>, ProvisionFault>;

    /// Inject member-stage dependencies into the minimally-constructed
    /// instance. Default: nothing to inject.
    fn inject(&self, instance: &Instance, deps: &ResolvedSet) -> Result<(), ProvisionFault> {
        let _ = (instance, deps);
        Ok(())
    }

    /// Whether instances of this recipe's key support late-binding
    /// delegation, making them eligible as deferred-cycle targets.
    fn delegatable(&self) -> bool {
        false
    }
}

/// A recipe synthesized on demand for a key with no explicit binding.
pub struct JitRecipe {
    pub recipe: std::sync::Arc<dyn ConstructionRecipe>,
    pub scope: ScopeKind,
}

/// Supplies synthesized recipes, standing in for constructor-metadata
/// discovery. Configured once per scope tree.
pub trait JitRecipeProvider: Send + Sync {
    /// A recipe for `key`, or `None` if the key cannot be synthesized.
    fn recipe_for(&self, key: &Key) -> Option<JitRecipe>;
}

/// Observes successful provisions. Configured once per scope tree and
/// invoked outside all locks, once per actual construction (cache hits on
/// singletons do not re-fire).
pub trait ProvisionListener: Send + Sync {
    fn on_provision(&self, key: &Key, source: &Source);
}
