//! End-to-end scope-hierarchy behavior: one-way visibility, overrides,
//! ban propagation, and lifetime-bound eviction.

mod support;

use std::sync::Arc;

use support::{bind_value, U32Synthesizer};
use wyre::{
    BindingError, FnRecipe, Key, ResolutionError, ScopeExt, ScopeKind, ScopeTree,
};

#[test]
fn descendants_resolve_ancestor_bindings() {
    let root = ScopeTree::builder().build();
    bind_value(&root, 10u32, ScopeKind::Unscoped);

    let child = root.child();
    let grandchild = child.child();
    assert_eq!(*grandchild.get::<u32>().unwrap(), 10);
}

#[test]
fn nearest_binding_wins_for_descendants() {
    let root = ScopeTree::builder().build();
    bind_value(&root, 1u32, ScopeKind::Unscoped);
    let child = root.child();
    bind_value(&child, 2u32, ScopeKind::Unscoped);

    assert_eq!(*child.get::<u32>().unwrap(), 2);
    assert_eq!(*root.get::<u32>().unwrap(), 1);
}

#[test]
fn parents_never_resolve_child_bindings() {
    let root = ScopeTree::builder().build();
    let child = root.child();
    bind_value(&child, 2u32, ScopeKind::Unscoped);

    assert!(root.get::<u32>().is_err());
}

#[test]
fn singletons_are_shared_across_the_tree() {
    let root = ScopeTree::builder().build();
    root.bind(
        Key::of::<String>(),
        Arc::new(FnRecipe::producing(|| String::from("tree-wide"))),
        ScopeKind::Singleton,
    )
    .unwrap();

    let from_root = root.get::<String>().unwrap();
    let from_child = root.child().get::<String>().unwrap();
    assert!(Arc::ptr_eq(&from_root, &from_child));
}

#[test]
fn duplicate_binding_at_one_level_is_rejected() {
    let root = ScopeTree::builder().build();
    bind_value(&root, 1u32, ScopeKind::Unscoped);
    let err = root
        .bind(
            Key::of::<u32>(),
            Arc::new(FnRecipe::producing(|| 2u32)),
            ScopeKind::Unscoped,
        )
        .unwrap_err();
    assert!(matches!(err, BindingError::DuplicateBinding { .. }));
}

#[test]
fn ancestor_synthesis_cannot_shadow_a_descendant_binding() {
    let root = ScopeTree::builder()
        .jit_provider(Arc::new(U32Synthesizer(7)))
        .build();
    let child = root.child();
    bind_value(&child, 42u32, ScopeKind::Unscoped);

    assert_eq!(*child.get::<u32>().unwrap(), 42);
    let errors = root.get::<u32>().unwrap_err();
    assert!(matches!(
        errors.first(),
        ResolutionError::ConflictingChildBinding { .. }
    ));
}

#[test]
fn sibling_scopes_cannot_synthesize_a_banned_key_either() {
    let root = ScopeTree::builder()
        .jit_provider(Arc::new(U32Synthesizer(7)))
        .build();
    let owner = root.child();
    let sibling = root.child();
    bind_value(&owner, 42u32, ScopeKind::Unscoped);

    // The sibling cannot see the owner's binding and may not synthesize
    // around it at the shared ancestor.
    let errors = sibling.get::<u32>().unwrap_err();
    assert!(matches!(
        errors.first(),
        ResolutionError::ConflictingChildBinding { .. }
    ));
}

#[test]
fn dropping_the_owning_child_restores_synthesis() {
    let root = ScopeTree::builder()
        .jit_provider(Arc::new(U32Synthesizer(7)))
        .build();
    let child = root.child();
    bind_value(&child, 42u32, ScopeKind::Unscoped);
    assert!(root.get::<u32>().is_err());

    child.close();
    assert_eq!(*root.get::<u32>().unwrap(), 7);
}

#[test]
fn a_second_childs_independent_ban_keeps_holding() {
    let root = ScopeTree::builder()
        .jit_provider(Arc::new(U32Synthesizer(7)))
        .build();
    let first = root.child();
    let second = root.child();
    bind_value(&first, 1u32, ScopeKind::Unscoped);
    bind_value(&second, 2u32, ScopeKind::Unscoped);

    first.close();
    // Second child still owns the key exclusively.
    let errors = root.get::<u32>().unwrap_err();
    assert!(matches!(
        errors.first(),
        ResolutionError::ConflictingChildBinding { .. }
    ));

    second.close();
    assert_eq!(*root.get::<u32>().unwrap(), 7);
}

#[test]
fn live_descendants_keep_a_closed_handles_scope_alive() {
    let root = ScopeTree::builder()
        .jit_provider(Arc::new(U32Synthesizer(7)))
        .build();
    let child = root.child();
    let grandchild = child.child();
    bind_value(&child, 42u32, ScopeKind::Unscoped);

    // The grandchild still resolves through the child after the child's
    // own handle is gone, so the ban must hold.
    child.close();
    assert_eq!(*grandchild.get::<u32>().unwrap(), 42);
    assert!(root.get::<u32>().is_err());

    // Only once the whole subtree is unreachable does the ban lift.
    drop(grandchild);
    assert_eq!(*root.get::<u32>().unwrap(), 7);
}

#[test]
fn registering_over_a_live_synthesized_binding_is_rejected() {
    let root = ScopeTree::builder()
        .jit_provider(Arc::new(U32Synthesizer(7)))
        .build();
    // Force synthesis at the root.
    assert_eq!(*root.get::<u32>().unwrap(), 7);

    let child = root.child();
    let err = child
        .bind(
            Key::of::<u32>(),
            Arc::new(FnRecipe::producing(|| 42u32)),
            ScopeKind::Unscoped,
        )
        .unwrap_err();
    assert!(matches!(err, BindingError::ConflictingChildBinding { .. }));
}
