//! Shared helpers for the end-to-end tests.

// Each test binary compiles this module separately and uses a subset.
#![allow(dead_code)]

use std::sync::Arc;

use wyre::{
    FnRecipe, InstanceRecipe, JitRecipe, JitRecipeProvider, Key, Scope, ScopeKind,
};

/// Bind a ready-made value under its unqualified key.
pub fn bind_value<T: Send + Sync + 'static>(scope: &Scope, value: T, kind: ScopeKind) {
    scope
        .bind(Key::of::<T>(), Arc::new(InstanceRecipe::new(value)), kind)
        .unwrap();
}

/// Synthesizes `u32` bindings on demand and nothing else.
pub struct U32Synthesizer(pub u32);

impl JitRecipeProvider for U32Synthesizer {
    fn recipe_for(&self, key: &Key) -> Option<JitRecipe> {
        let value = self.0;
        (*key == Key::of::<u32>()).then(|| JitRecipe {
            recipe: Arc::new(FnRecipe::producing(move || value)),
            scope: ScopeKind::Unscoped,
        })
    }
}
