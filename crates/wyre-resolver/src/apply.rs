//! Singleton scope application.
//!
//! Drives the per-tree slot table around real construction: the thread
//! holding the tree's construction right computes, then publishes or
//! reverts; everyone else blocks until the slot settles. Re-entrant
//! requests from inside the computing chain are intercepted by the
//! construction context before they can reach the table, so a thread
//! never waits on itself.

use std::sync::Arc;

use tracing::trace;

use wyre_common::{DependencyChain, Handle, ResolutionError};
use wyre_registry::{Begin, Binding, DependencyRequest, ScopeNode};

use crate::context::ConstructionContext;
use crate::provision::{Failed, Outcome, construct, cycle_handle};

/// Provide from a singleton-scoped binding.
pub(crate) fn provide_singleton(
    owner: &Arc<ScopeNode>,
    binding: &Arc<Binding>,
    request: &DependencyRequest,
    ctx: &mut ConstructionContext,
) -> Outcome {
    let factory = binding.factory_id();

    // A singleton re-requested within its own construction chain is a
    // cycle; it must never reach the table or it would deadlock on its
    // own computation.
    if let Some(partial) = ctx.probe(factory) {
        return cycle_handle(owner, binding, request, partial, ctx);
    }

    match owner.tree().singletons().begin(factory) {
        Begin::Ready(value) => {
            trace!(
                target: "wyre::resolve",
                key = %binding.key(),
                factory = %factory,
                "singleton cache hit"
            );
            Ok(value.map(Handle::Direct))
        }
        Begin::Failed(error) => {
            ctx.sink_mut().push(error);
            Err(Failed)
        }
        Begin::Compute => match construct(owner, binding, request, ctx) {
            Ok(handle) => {
                let value = match &handle {
                    Some(Handle::Direct(instance)) => Some(instance.clone()),
                    Some(Handle::Deferred(_)) => {
                        // construct() only returns deferred handles on the
                        // cycle path, which probe() already ruled out.
                        debug_assert!(false, "singleton construction returned a deferred handle");
                        None
                    }
                    None => None,
                };
                owner.tree().singletons().publish(factory, value);
                Ok(handle)
            }
            Err(Failed) => {
                let error = ctx.sink().last().cloned().unwrap_or_else(|| {
                    ResolutionError::MissingBinding {
                        key: binding.key().clone(),
                        chain: DependencyChain::default(),
                    }
                });
                owner.tree().singletons().fail(factory, error);
                Err(Failed)
            }
        },
    }
}
