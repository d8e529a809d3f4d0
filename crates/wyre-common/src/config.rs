//! Engine configuration.
//!
//! Configuration is captured once at scope-tree creation and inherited by
//! every child scope. Nothing is read from process-wide mutable state, so
//! two trees in one process can run with different policies and tests can
//! exercise both without environment juggling.

/// Resolution policy for one scope tree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EngineConfig {
    /// Whether construction cycles may be bridged with deferred handles.
    ///
    /// When `false` every cycle is a hard [`CircularDependency`] error,
    /// never silently proxied.
    ///
    /// [`CircularDependency`]: crate::errors::ResolutionError::CircularDependency
    pub deferred_cycles: bool,

    /// Whether bindings may be synthesized on demand from a recipe
    /// provider when no explicit binding exists.
    pub jit_allowed: bool,
}

impl EngineConfig {
    /// Default policy: deferred cycles and on-demand synthesis enabled.
    pub const fn new() -> Self {
        Self {
            deferred_cycles: true,
            jit_allowed: true,
        }
    }

    /// Disable cycle bridging; all cycles become fatal.
    pub const fn without_deferred_cycles(mut self) -> Self {
        self.deferred_cycles = false;
        self
    }

    /// Disable on-demand binding synthesis; only explicit bindings resolve.
    pub const fn without_jit(mut self) -> Self {
        self.jit_allowed = false;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
