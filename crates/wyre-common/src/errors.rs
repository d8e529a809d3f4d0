//! Error taxonomy and dependency-chain diagnostics.
//!
//! Registration-time errors ([`BindingError`]) are reported immediately to
//! the registering caller. Resolution-time errors ([`ResolutionError`])
//! carry a snapshot of the dependency chain that led to them and are
//! accumulated into a [`ResolutionErrors`] aggregate so one top-level call
//! can report every independent failure found in a single pass.
//!
//! Every variant is `Clone`: a failed singleton must surface the same
//! error to every thread that was waiting on it, so user construction
//! faults are carried behind an `Arc` rather than boxed uniquely.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::key::Key;
use crate::source::Source;

/// A fault raised inside user construction logic, wrapped for attribution.
pub type ProvisionFault = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Which injection point a dependency edge feeds.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum InjectStage {
    /// A constructor argument. The dependent cannot exist without it, so
    /// a cycle closing through this edge is always fatal.
    Constructor,
    /// A member injected after minimal construction. Cycles closing here
    /// can be bridged with a partial instance or a deferred handle.
    Member,
}

impl fmt::Display for InjectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InjectStage::Constructor => f.write_str("constructor"),
            InjectStage::Member => f.write_str("member"),
        }
    }
}

/// One edge in the dependency chain leading to an error.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ChainFrame {
    pub key: Key,
    pub source: Source,
    pub stage: InjectStage,
}

/// Ordered snapshot of the in-flight dependency chain, outermost first.
///
/// Attached to every resolution error so the excluded formatting layer can
/// render "A -> B -> C" traces without re-running resolution.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct DependencyChain {
    frames: Vec<ChainFrame>,
}

impl DependencyChain {
    pub fn new(frames: Vec<ChainFrame>) -> Self {
        Self { frames }
    }

    #[inline]
    pub fn frames(&self) -> &[ChainFrame] {
        &self.frames
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Display for DependencyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", frame.key)?;
        }
        Ok(())
    }
}

/// Why a detected cycle could not be bridged.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CycleReason {
    /// The closing edge is a constructor argument; no instance exists yet
    /// to stand in for it.
    ConstructorEdge,
    /// The in-progress binding's recipe does not support late-binding
    /// delegation.
    NotDelegatable,
    /// Deferred-cycle bridging is disabled by configuration.
    DeferralDisabled,
}

impl fmt::Display for CycleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleReason::ConstructorEdge => {
                f.write_str("the cycle closes through a constructor argument")
            }
            CycleReason::NotDelegatable => f.write_str("the target type is not delegatable"),
            CycleReason::DeferralDisabled => f.write_str("deferred cycles are disabled"),
        }
    }
}

/// Errors detected at registration time.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum BindingError {
    /// The same key was declared twice at one scope level.
    #[error("{key} is already bound at this scope (first declared at {existing})")]
    DuplicateBinding {
        key: Key,
        existing: Source,
        duplicate: Source,
    },

    /// The key is exclusively owned elsewhere in the tree: a live
    /// descendant declared it, or an ancestor already synthesized it.
    #[error("{key} conflicts with a binding owned by another scope level")]
    ConflictingChildBinding { key: Key, declared_at: Source },
}

/// Errors detected while resolving an instance.
#[derive(Clone, Debug, Error)]
pub enum ResolutionError {
    /// No explicit binding and no viable synthesis path.
    #[error("no binding available for {key} (chain: {chain})")]
    MissingBinding { key: Key, chain: DependencyChain },

    /// A construction cycle that could not be bridged.
    #[error("circular dependency on {key}: {reason} (chain: {chain})")]
    CircularDependency {
        key: Key,
        reason: CycleReason,
        chain: DependencyChain,
    },

    /// Synthesis was requested for a key banned by a descendant scope.
    #[error("{key} is exclusively bound in a child scope (chain: {chain})")]
    ConflictingChildBinding { key: Key, chain: DependencyChain },

    /// A recipe produced no instance and the requesting edge did not
    /// permit absence.
    #[error("recipe for {key} (declared at {declared_at}) produced no instance")]
    NullProvided {
        key: Key,
        declared_at: Source,
        chain: DependencyChain,
    },

    /// A fault raised inside user construction logic.
    #[error("recipe for {key} (declared at {declared_at}) failed: {fault}")]
    ProvisionFailure {
        key: Key,
        declared_at: Source,
        chain: DependencyChain,
        fault: ProvisionFault,
    },
}

impl ResolutionError {
    /// The key the error is attributed to.
    pub fn key(&self) -> &Key {
        match self {
            ResolutionError::MissingBinding { key, .. }
            | ResolutionError::CircularDependency { key, .. }
            | ResolutionError::ConflictingChildBinding { key, .. }
            | ResolutionError::NullProvided { key, .. }
            | ResolutionError::ProvisionFailure { key, .. } => key,
        }
    }

    /// The dependency chain active when the error was recorded.
    pub fn chain(&self) -> &DependencyChain {
        match self {
            ResolutionError::MissingBinding { chain, .. }
            | ResolutionError::CircularDependency { chain, .. }
            | ResolutionError::ConflictingChildBinding { chain, .. }
            | ResolutionError::NullProvided { chain, .. }
            | ResolutionError::ProvisionFailure { chain, .. } => chain,
        }
    }
}

/// Aggregate of every independent failure found by one top-level call.
#[derive(Clone, Debug)]
pub struct ResolutionErrors {
    errors: Vec<ResolutionError>,
}

impl ResolutionErrors {
    /// Invariant: at least one error.
    pub fn new(errors: Vec<ResolutionError>) -> Self {
        debug_assert!(!errors.is_empty(), "empty ResolutionErrors");
        Self { errors }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ResolutionError> {
        self.errors.iter()
    }

    #[inline]
    pub fn first(&self) -> &ResolutionError {
        &self.errors[0]
    }

    pub fn into_vec(self) -> Vec<ResolutionError> {
        self.errors
    }
}

impl fmt::Display for ResolutionErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "resolution failed with {} error(s):", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            writeln!(f, "  {}) {err}", i + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolutionErrors {}
