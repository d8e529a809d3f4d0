//! Instances and the direct/deferred handle indirection.
//!
//! # Design
//!
//! A construction cycle cannot hand a dependent a finished instance —
//! the instance does not exist yet. Instead of generating a runtime proxy
//! object, the runtime hands out a [`Handle`]: either `Direct` (the real
//! instance) or `Deferred` (a single-assignment cell bound when the
//! proxied construction finishes). The indirection is an explicit,
//! compile-time-visible type; a holder that needs the real instance calls
//! [`Handle::resolve`] after its own construction completes.
//!
//! A [`DeferredCell`] is bound at most once. Binding twice is a logic
//! error in the resolver and trips a `debug_assert!` there.

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::key::Key;

/// A resolved instance. Type-erased; the facade layer downcasts.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Placeholder for an instance still under construction.
///
/// Exists only transiently between cycle detection and construction
/// completion within one resolution call. If the originating construction
/// fails, the cell is never bound and [`get`](DeferredCell::get) keeps
/// returning `None`.
pub struct DeferredCell {
    key: Key,
    cell: OnceLock<Instance>,
}

impl DeferredCell {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            cell: OnceLock::new(),
        }
    }

    /// The key this cell stands in for.
    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Bind the real instance. Returns `false` if the cell was already
    /// bound; the caller treats that as a logic error.
    pub fn bind(&self, instance: Instance) -> bool {
        self.cell.set(instance).is_ok()
    }

    /// The bound instance, if construction has finished.
    #[inline]
    pub fn get(&self) -> Option<Instance> {
        self.cell.get().cloned()
    }
}

impl fmt::Debug for DeferredCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredCell")
            .field("key", &self.key)
            .field("bound", &self.cell.get().is_some())
            .finish()
    }
}

/// A resolved dependency: either the instance itself or a deferred cell
/// that will hold it once a cycle finishes constructing.
#[derive(Clone, Debug)]
pub enum Handle {
    Direct(Instance),
    Deferred(Arc<DeferredCell>),
}

impl Handle {
    /// The instance, if available. `None` for a deferred handle whose
    /// construction has not finished (or failed).
    pub fn resolve(&self) -> Option<Instance> {
        match self {
            Handle::Direct(instance) => Some(instance.clone()),
            Handle::Deferred(cell) => cell.get(),
        }
    }

    #[inline]
    pub fn is_deferred(&self) -> bool {
        matches!(self, Handle::Deferred(_))
    }

    /// Resolve and downcast to a concrete type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.resolve().and_then(|i| i.downcast::<T>().ok())
    }
}
