//! The recursive resolution algorithm.
//!
//! `provide` turns a key into a live instance: resolve the binding
//! (explicit, cached, or synthesized), apply scope semantics, construct
//! with recursively-resolved dependencies, and bridge cycles according to
//! the policy below.
//!
//! # Error propagation
//!
//! Failures accumulate rather than throwing at first sight: when a
//! recipe's dependencies fan out, every sibling edge is attempted and
//! each failure is recorded, so one top-level call reports everything
//! found in one pass. Along a single chain, the first fatal error
//! (missing binding, disallowed cycle) short-circuits that chain only.
//! Internally this is a `Result<_, Failed>` where `Failed` is just a
//! marker — the actual errors are already in the context's sink.
//!
//! # Cycle policy
//!
//! Re-entering an in-progress construction closes a cycle. The closing
//! edge decides the outcome:
//! - constructor-stage edge: fatal, always — no instance exists yet to
//!   pass as a constructor argument;
//! - member-stage edge with a minimally-constructed partial: hand the
//!   partial back directly;
//! - member-stage edge before minimal construction: a deferred proxy,
//!   provided the configuration allows it and the target recipe is
//!   delegatable; otherwise fatal.

use tracing::{debug, trace};

use wyre_common::{
    ChainFrame, CycleReason, Handle, InjectStage, Instance, Key, ResolutionError,
    ResolutionErrors,
};
use wyre_registry::{
    Binding, DependencyRequest, LookupFailure, ResolvedDep, ResolvedSet, Scope, ScopeKind,
    ScopeNode,
};

use std::sync::Arc;

use crate::apply;
use crate::context::{ConstructionContext, TryStart};

/// Marker for a chain that already recorded its errors in the sink.
pub(crate) struct Failed;

pub(crate) type Outcome = Result<Option<Handle>, Failed>;

/// Resolve `key` from `scope` with a fresh construction context.
///
/// The entry point for one logical resolution call. Absent instances are
/// never accepted at the top level.
pub fn provide(scope: &Scope, key: &Key) -> Result<Instance, ResolutionErrors> {
    let mut ctx = ConstructionContext::new();
    debug!(target: "wyre::resolve", scope = %scope.id(), key = %key, "provide");

    let request = DependencyRequest::constructor(key.clone());
    match resolve_request(scope.node(), &request, &mut ctx) {
        Ok(Some(handle)) => match handle.resolve() {
            Some(instance) => Ok(instance),
            None => {
                // A fresh context cannot observe an in-flight construction
                // at depth zero, so the top-level handle is always direct.
                debug_assert!(false, "top-level resolution produced an unbound handle");
                Err(ResolutionErrors::new(vec![ResolutionError::MissingBinding {
                    key: key.clone(),
                    chain: ctx.chain(),
                }]))
            }
        },
        Ok(None) => {
            debug_assert!(false, "top-level request cannot permit absence");
            Err(ResolutionErrors::new(vec![ResolutionError::MissingBinding {
                key: key.clone(),
                chain: ctx.chain(),
            }]))
        }
        Err(Failed) => Err(ResolutionErrors::new(ctx.take_errors())),
    }
}

/// Resolve one dependency edge at `node`.
pub(crate) fn resolve_request(
    node: &Arc<ScopeNode>,
    request: &DependencyRequest,
    ctx: &mut ConstructionContext,
) -> Outcome {
    let key = request.key();
    let (binding, owner) = match node.lookup_or_synthesize(key) {
        Ok(found) => found,
        Err(LookupFailure::Missing) => {
            let chain = ctx.chain();
            ctx.sink_mut().push(ResolutionError::MissingBinding {
                key: key.clone(),
                chain,
            });
            return Err(Failed);
        }
        Err(LookupFailure::Banned) => {
            let chain = ctx.chain();
            ctx.sink_mut()
                .push(ResolutionError::ConflictingChildBinding {
                    key: key.clone(),
                    chain,
                });
            return Err(Failed);
        }
    };

    ctx.push_frame(ChainFrame {
        key: key.clone(),
        source: binding.source(),
        stage: request.stage(),
    });
    let outcome = match binding.scope() {
        ScopeKind::Singleton => apply::provide_singleton(&owner, &binding, request, ctx),
        ScopeKind::Unscoped => construct(&owner, &binding, request, ctx),
    };
    ctx.pop_frame();

    match outcome? {
        Some(handle) => Ok(Some(handle)),
        None if request.allow_absent() => Ok(None),
        None => {
            let chain = ctx.chain();
            ctx.sink_mut().push(ResolutionError::NullProvided {
                key: key.clone(),
                declared_at: binding.source(),
                chain,
            });
            Err(Failed)
        }
    }
}

/// Construct an instance from `binding`, detecting re-entrancy.
pub(crate) fn construct(
    owner: &Arc<ScopeNode>,
    binding: &Arc<Binding>,
    request: &DependencyRequest,
    ctx: &mut ConstructionContext,
) -> Outcome {
    let factory = binding.factory_id();
    match ctx.try_start(factory) {
        TryStart::InProgress { partial } => cycle_handle(owner, binding, request, partial, ctx),
        TryStart::Entered => build(owner, binding, ctx),
    }
}

/// Run both construction phases for a freshly-started record.
fn build(
    owner: &Arc<ScopeNode>,
    binding: &Arc<Binding>,
    ctx: &mut ConstructionContext,
) -> Outcome {
    let factory = binding.factory_id();
    let recipe = binding.recipe().clone();
    trace!(
        target: "wyre::resolve",
        key = %binding.key(),
        factory = %factory,
        depth = ctx.depth(),
        "constructing"
    );

    let ctor = match resolve_stage(owner, &recipe, InjectStage::Constructor, ctx) {
        Ok(set) => set,
        Err(Failed) => {
            ctx.abort(factory);
            return Err(Failed);
        }
    };

    let instance = match recipe.construct(&ctor) {
        Ok(instance) => instance,
        Err(fault) => {
            let chain = ctx.chain();
            ctx.sink_mut().push(ResolutionError::ProvisionFailure {
                key: binding.key().clone(),
                declared_at: binding.source(),
                chain,
                fault,
            });
            ctx.abort(factory);
            return Err(Failed);
        }
    };

    let Some(instance) = instance else {
        // Deliberately absent; nothing to inject into.
        ctx.finish(factory, None);
        return Ok(None);
    };

    ctx.set_partial(factory, instance.clone());

    let members = match resolve_stage(owner, &recipe, InjectStage::Member, ctx) {
        Ok(set) => set,
        Err(Failed) => {
            ctx.abort(factory);
            return Err(Failed);
        }
    };

    if let Err(fault) = recipe.inject(&instance, &members) {
        let chain = ctx.chain();
        ctx.sink_mut().push(ResolutionError::ProvisionFailure {
            key: binding.key().clone(),
            declared_at: binding.source(),
            chain,
            fault,
        });
        ctx.abort(factory);
        return Err(Failed);
    }

    ctx.finish(factory, Some(instance.clone()));

    for listener in owner.tree().listeners() {
        listener.on_provision(binding.key(), &binding.source());
    }

    Ok(Some(Handle::Direct(instance)))
}

/// Resolve every dependency of one stage, attempting all siblings before
/// reporting failure so independent errors aggregate.
fn resolve_stage(
    owner: &Arc<ScopeNode>,
    recipe: &Arc<dyn wyre_registry::ConstructionRecipe>,
    stage: InjectStage,
    ctx: &mut ConstructionContext,
) -> Result<ResolvedSet, Failed> {
    let mut resolved = Vec::new();
    let mut failed = false;
    for dep in recipe.dependencies().iter().filter(|d| d.stage() == stage) {
        match resolve_request(owner, dep, ctx) {
            Ok(handle) => resolved.push(ResolvedDep::new(dep.key().clone(), handle)),
            Err(Failed) => failed = true,
        }
    }
    if failed {
        Err(Failed)
    } else {
        Ok(ResolvedSet::new(resolved))
    }
}

/// Decide what a cycle-closing edge receives.
pub(crate) fn cycle_handle(
    owner: &Arc<ScopeNode>,
    binding: &Arc<Binding>,
    request: &DependencyRequest,
    partial: Option<Instance>,
    ctx: &mut ConstructionContext,
) -> Outcome {
    let key = binding.key();

    if request.stage() == InjectStage::Constructor {
        return cycle_error(key, CycleReason::ConstructorEdge, ctx);
    }
    if let Some(partial) = partial {
        trace!(
            target: "wyre::resolve",
            key = %key,
            "cycle satisfied with partial instance"
        );
        return Ok(Some(Handle::Direct(partial)));
    }
    if !owner.tree().config().deferred_cycles {
        return cycle_error(key, CycleReason::DeferralDisabled, ctx);
    }
    if !binding.recipe().delegatable() {
        return cycle_error(key, CycleReason::NotDelegatable, ctx);
    }

    debug!(
        target: "wyre::resolve",
        key = %key,
        factory = %binding.factory_id(),
        "cycle bridged with deferred handle"
    );
    Ok(Some(ctx.issue_proxy(binding.factory_id(), key.clone())))
}

fn cycle_error(key: &Key, reason: CycleReason, ctx: &mut ConstructionContext) -> Outcome {
    let chain = ctx.chain();
    ctx.sink_mut().push(ResolutionError::CircularDependency {
        key: key.clone(),
        reason,
        chain,
    });
    Err(Failed)
}
