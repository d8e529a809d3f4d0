//! Singleton slot storage.
//!
//! # Design
//!
//! One table per scope tree, one construction right for the whole table.
//! The lock is coarse on purpose: singleton construction anywhere in the
//! tree is linearized through a single logical lock, so two threads can
//! never hold construction rights for different bindings and wait on each
//! other — the cross-binding deadlock a per-binding lock would invite.
//! The trade is contention: while one thread builds, every other
//! first-use requester in the tree waits.
//!
//! The right is re-entrant within the owning thread. A singleton whose
//! construction needs another uncomputed singleton proceeds inline
//! (depth-counted); a re-entrant request for a singleton *already being
//! built in the same chain* never reaches this table at all — the
//! per-call construction context intercepts it as a cycle first, so the
//! builder thread cannot block on itself.
//!
//! Per slot the state machine is `uncomputed -> computing -> computed`,
//! where "uncomputed" is the absence of an entry. A failed computation
//! leaves the slot uncomputed so a later call may retry. Failures are
//! stamped with the table generation (bumped each time the construction
//! right is fully released): threads that were already waiting observe
//! the failure, threads arriving afterwards compete to retry.

use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};

use rustc_hash::FxHashMap;
use tracing::debug;

use wyre_common::{Instance, ResolutionError};

use crate::binding::FactoryId;

#[derive(Default)]
struct TableState {
    /// Published values. Singletons may legitimately cache an absent
    /// result.
    slots: FxHashMap<FactoryId, Option<Instance>>,
    /// Last failed attempt per factory, stamped with the generation it
    /// failed in.
    failures: FxHashMap<FactoryId, (u64, ResolutionError)>,
    /// Thread currently holding the construction right, with its
    /// re-entrancy depth.
    builder: Option<(ThreadId, u32)>,
    /// Bumped whenever the construction right is fully released.
    generation: u64,
}

/// Outcome of [`SingletonTable::begin`].
pub enum Begin {
    /// Already computed; here is the published value.
    Ready(Option<Instance>),
    /// This caller holds the construction right for this slot and must
    /// construct, then call [`publish`](SingletonTable::publish) or
    /// [`fail`](SingletonTable::fail).
    Compute,
    /// The attempt this caller was waiting on failed.
    Failed(ResolutionError),
}

/// Singleton slots for one scope tree.
#[derive(Default)]
pub struct SingletonTable {
    state: Mutex<TableState>,
    cv: Condvar,
}

impl SingletonTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the slot for `factory`.
    ///
    /// Blocks while another thread holds the construction right; wakes to
    /// the published value, to that attempt's failure, or to a chance to
    /// construct.
    pub fn begin(&self, factory: FactoryId) -> Begin {
        let me = thread::current().id();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let entered_at = state.generation;
        loop {
            if let Some(value) = state.slots.get(&factory) {
                return Begin::Ready(value.clone());
            }
            if let Some((failed_in, error)) = state.failures.get(&factory)
                && *failed_in >= entered_at
            {
                return Begin::Failed(error.clone());
            }
            match &mut state.builder {
                None => {
                    state.builder = Some((me, 1));
                    return Begin::Compute;
                }
                Some((owner, depth)) if *owner == me => {
                    *depth += 1;
                    return Begin::Compute;
                }
                Some(_) => {
                    state = self.cv.wait(state).unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }

    /// Publish the computed value, release one level of the construction
    /// right, and wake waiters.
    pub fn publish(&self, factory: FactoryId, value: Option<Instance>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.failures.remove(&factory);
        state.slots.insert(factory, value);
        Self::release(&mut state);
        drop(state);
        self.cv.notify_all();
    }

    /// Leave the slot uncomputed, surface `error` to the current waiters,
    /// release one level of the construction right, and wake them. A
    /// later call may attempt again.
    pub fn fail(&self, factory: FactoryId, error: ResolutionError) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        debug!(
            target: "wyre::scope",
            factory = %factory,
            generation = state.generation,
            "singleton construction failed; slot left uncomputed"
        );
        let generation = state.generation;
        state.failures.insert(factory, (generation, error));
        Self::release(&mut state);
        drop(state);
        self.cv.notify_all();
    }

    /// The published value, if any. Does not block.
    pub fn peek(&self, factory: FactoryId) -> Option<Option<Instance>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.slots.get(&factory).cloned()
    }

    fn release(state: &mut TableState) {
        match &mut state.builder {
            Some((_, depth)) if *depth > 1 => *depth -= 1,
            Some(_) => {
                state.builder = None;
                state.generation += 1;
            }
            None => debug_assert!(false, "released a construction right nobody holds"),
        }
    }
}
