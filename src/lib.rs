//! wyre — a hierarchical dependency-resolution runtime.
//!
//! Bindings map typed [`Key`]s to construction recipes; a [`Scope`] tree
//! resolves keys to live instances at request time, bridging true
//! construction cycles with deferred handles, enforcing singleton
//! semantics under concurrency, and keeping parent/child scopes from
//! shadowing each other's bindings.
//!
//! This facade crate re-exports the public surface of the member crates
//! and adds typed convenience accessors:
//!
//! ```
//! use std::sync::Arc;
//! use wyre::{InstanceRecipe, Key, ScopeExt, ScopeKind, ScopeTree};
//!
//! let root = ScopeTree::builder().build();
//! root.bind(
//!     Key::of::<u32>(),
//!     Arc::new(InstanceRecipe::new(7u32)),
//!     ScopeKind::Unscoped,
//! )
//! .unwrap();
//!
//! let value: Arc<u32> = root.get::<u32>().unwrap();
//! assert_eq!(*value, 7);
//! ```

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;

pub use wyre_common::{
    BindingError, ChainFrame, CycleReason, DeferredCell, DependencyChain, EngineConfig,
    ErrorSink, Handle, InjectStage, Instance, Key, ProvisionFault, ResolutionError,
    ResolutionErrors, Source, TypeTag,
};
pub use wyre_registry::{
    Binding, ConstructionRecipe, DependencyRequest, FactoryId, FnRecipe, InstanceRecipe,
    JitRecipe, JitRecipeProvider, ProvisionListener, ResolvedDep, ResolvedSet, Scope, ScopeId,
    ScopeKind, ScopeTree, ScopeTreeBuilder,
};
pub use wyre_resolver::{ConstructionContext, TryStart, provide};

/// The resolved instance did not downcast to the requested type; the
/// recipe registered for the key produces something else.
#[derive(Debug, Error)]
#[error("resolved instance for {key} is not a {expected}")]
struct TypeMismatch {
    key: Key,
    expected: &'static str,
}

fn typed<T: Any + Send + Sync>(scope: &Scope, key: Key) -> Result<Arc<T>, ResolutionErrors> {
    let instance = provide(scope, &key)?;
    instance.downcast::<T>().map_err(|_| {
        let fault: ProvisionFault = Arc::new(TypeMismatch {
            key: key.clone(),
            expected: std::any::type_name::<T>(),
        });
        ResolutionErrors::new(vec![ResolutionError::ProvisionFailure {
            key,
            declared_at: Source::unknown(),
            chain: DependencyChain::default(),
            fault,
        }])
    })
}

/// Typed accessors over [`provide`].
pub trait ScopeExt {
    /// Resolve the unqualified binding for `T` and downcast.
    fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolutionErrors>;

    /// Resolve the binding for `T` under `qualifier` and downcast.
    fn get_qualified<T: Any + Send + Sync>(
        &self,
        qualifier: &str,
    ) -> Result<Arc<T>, ResolutionErrors>;
}

impl ScopeExt for Scope {
    fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolutionErrors> {
        typed(self, Key::of::<T>())
    }

    fn get_qualified<T: Any + Send + Sync>(
        &self,
        qualifier: &str,
    ) -> Result<Arc<T>, ResolutionErrors> {
        typed(self, Key::qualified::<T>(qualifier.to_owned()))
    }
}
