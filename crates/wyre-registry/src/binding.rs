//! Published binding records.

use std::fmt;
use std::sync::Arc;

use wyre_common::{Key, Source};

use crate::recipe::ConstructionRecipe;

/// Identifies one published binding's factory across the whole tree.
///
/// Allocated from a per-tree atomic counter; also the key for singleton
/// slots and for per-call construction records.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FactoryId(pub u32);

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// How instances produced by a binding are cached.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeKind {
    /// A fresh instance per request.
    Unscoped,
    /// One instance per scope tree, built at most once under the tree
    /// lock.
    Singleton,
}

/// The registered recipe mapping a [`Key`] to a construction strategy and
/// scope.
///
/// Immutable once published; replacing a binding creates a new `Binding`,
/// never mutates in place.
pub struct Binding {
    key: Key,
    scope: ScopeKind,
    recipe: Arc<dyn ConstructionRecipe>,
    source: Source,
    factory_id: FactoryId,
    synthesized: bool,
}

impl Binding {
    pub(crate) fn new(
        key: Key,
        scope: ScopeKind,
        recipe: Arc<dyn ConstructionRecipe>,
        source: Source,
        factory_id: FactoryId,
        synthesized: bool,
    ) -> Self {
        Self {
            key,
            scope,
            recipe,
            source,
            factory_id,
            synthesized,
        }
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn scope(&self) -> ScopeKind {
        self.scope
    }

    #[inline]
    pub fn recipe(&self) -> &Arc<dyn ConstructionRecipe> {
        &self.recipe
    }

    #[inline]
    pub fn source(&self) -> Source {
        self.source
    }

    #[inline]
    pub fn factory_id(&self) -> FactoryId {
        self.factory_id
    }

    /// Whether this binding was synthesized on demand rather than
    /// explicitly declared.
    #[inline]
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("scope", &self.scope)
            .field("source", &self.source)
            .field("factory_id", &self.factory_id)
            .field("synthesized", &self.synthesized)
            .finish_non_exhaustive()
    }
}
