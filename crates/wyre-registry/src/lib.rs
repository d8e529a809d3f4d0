//! Binding storage and the scope hierarchy for the wyre runtime.
//!
//! This crate owns everything that persists between resolution calls:
//! published [`Binding`]s, the [`Scope`] tree with its parent-chain lookup
//! and one-way visibility, the ban multiset that keeps ancestor synthesis
//! from shadowing a child's explicit bindings, the concurrent
//! insert-if-absent cache for synthesized bindings, and the singleton slot
//! table. The resolution algorithm itself lives in `wyre-resolver`.

// The externally-supplied construction capability
pub mod recipe;
pub use recipe::{
    ConstructionRecipe, DependencyRequest, JitRecipe, JitRecipeProvider, ProvisionListener,
    ResolvedDep, ResolvedSet,
};

// Stock recipe implementations for hosts and tests
pub mod recipes;
pub use recipes::{FnRecipe, InstanceRecipe};

// Published binding records
pub mod binding;
pub use binding::{Binding, FactoryId, ScopeKind};

// Ban multiset with per-contributor retraction
mod bans;

// Singleton slot storage and state transitions
pub mod singleton;
pub use singleton::{Begin, SingletonTable};

// The scope tree
pub mod scope;
pub use scope::{LookupFailure, Scope, ScopeId, ScopeNode, ScopeTree, ScopeTreeBuilder};
