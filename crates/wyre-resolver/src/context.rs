//! Per-call construction state and cycle detection.
//!
//! # Design
//!
//! `ConstructionContext` replaces ambient thread-local re-entrancy guards
//! with an explicit value threaded through every resolution call: cycle
//! detection is a pure function of passed-in state, which keeps the
//! engine testable without spinning real threads.
//!
//! One context exists per top-level resolution call and is never shared
//! across threads. Per factory it tracks a [`ConstructionRecord`] whose
//! state moves `not-started -> in-progress -> finished`, monotonically,
//! once per record; [`finish`](ConstructionContext::finish) also clears
//! the record so a pooled context can be reused for a later independent
//! request of the same factory.
//!
//! Re-entering an in-progress record is how a cycle announces itself. The
//! caller gets back whatever is known about the in-flight construction —
//! the partial instance if minimal construction already happened, nothing
//! otherwise — and decides between handing out the partial, issuing a
//! deferred proxy, or failing (see the cycle policy in the provisioning
//! module).
//!
//! # Debug-mode safety
//!
//! In debug builds, binding the same proxy cell twice panics, as does
//! finishing a record that was never started.

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use wyre_common::{ChainFrame, DeferredCell, DependencyChain, ErrorSink, Handle, Instance, Key};
use wyre_registry::FactoryId;

/// Result of attempting to start construction for a factory.
#[derive(Debug)]
pub enum TryStart {
    /// Not in progress; the record is now marked and the caller must
    /// construct, then call `finish` or `abort`.
    Entered,
    /// Already in progress in this context — a cycle. Carries the partial
    /// instance when minimal construction has completed.
    InProgress { partial: Option<Instance> },
}

#[derive(Default)]
struct ConstructionRecord {
    partial: Option<Instance>,
    proxies: SmallVec<[Arc<DeferredCell>; 1]>,
}

/// State for one logical resolution call.
pub struct ConstructionContext {
    records: FxHashMap<FactoryId, ConstructionRecord>,
    chain: Vec<ChainFrame>,
    sink: ErrorSink,
    // One context per call, single-threaded by contract.
    _single_thread: PhantomData<Cell<()>>,
}

impl ConstructionContext {
    pub fn new() -> Self {
        Self {
            records: FxHashMap::default(),
            chain: Vec::new(),
            sink: ErrorSink::new(),
            _single_thread: PhantomData,
        }
    }

    // -----------------------------------------------------------------------
    // Record lifecycle
    // -----------------------------------------------------------------------

    /// Start construction for `factory`, or report that it is already in
    /// flight in this context.
    pub fn try_start(&mut self, factory: FactoryId) -> TryStart {
        match self.records.get(&factory) {
            Some(record) => TryStart::InProgress {
                partial: record.partial.clone(),
            },
            None => {
                self.records.insert(factory, ConstructionRecord::default());
                TryStart::Entered
            }
        }
    }

    /// Is `factory` in progress here? Returns the partial instance slot
    /// when it is. Unlike [`try_start`](Self::try_start) this never marks
    /// the record.
    pub fn probe(&self, factory: FactoryId) -> Option<Option<Instance>> {
        self.records.get(&factory).map(|r| r.partial.clone())
    }

    /// Record the minimally-constructed instance so re-entrant requests
    /// during member injection can observe it.
    pub fn set_partial(&mut self, factory: FactoryId, instance: Instance) {
        if let Some(record) = self.records.get_mut(&factory) {
            record.partial = Some(instance);
        } else {
            debug_assert!(false, "set_partial on a record that was never started");
        }
    }

    /// Issue a deferred proxy for the in-flight construction of `factory`.
    pub fn issue_proxy(&mut self, factory: FactoryId, key: Key) -> Handle {
        let cell = Arc::new(DeferredCell::new(key));
        if let Some(record) = self.records.get_mut(&factory) {
            record.proxies.push(cell.clone());
        } else {
            debug_assert!(false, "issue_proxy on a record that was never started");
        }
        Handle::Deferred(cell)
    }

    /// Finish construction: bind every proxy issued for `factory` to the
    /// real instance (exactly once) and clear the record.
    ///
    /// `instance` is `None` when the recipe legitimately produced no
    /// instance; any issued proxies then stay unbound.
    pub fn finish(&mut self, factory: FactoryId, instance: Option<Instance>) {
        let Some(record) = self.records.remove(&factory) else {
            debug_assert!(false, "finish on a record that was never started");
            return;
        };
        if let Some(instance) = instance {
            for proxy in record.proxies {
                let fresh = proxy.bind(instance.clone());
                debug_assert!(fresh, "proxy bound twice for {factory}");
            }
        }
    }

    /// Drop the record after a failed construction. Issued proxies stay
    /// unbound; their holders observe `None`.
    pub fn abort(&mut self, factory: FactoryId) {
        self.records.remove(&factory);
    }

    // -----------------------------------------------------------------------
    // Dependency chain diagnostics
    // -----------------------------------------------------------------------

    pub fn push_frame(&mut self, frame: ChainFrame) {
        self.chain.push(frame);
    }

    pub fn pop_frame(&mut self) {
        let popped = self.chain.pop();
        debug_assert!(popped.is_some(), "pop_frame on an empty chain");
    }

    /// Snapshot of the in-flight chain, outermost first.
    pub fn chain(&self) -> DependencyChain {
        DependencyChain::new(self.chain.clone())
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    // -----------------------------------------------------------------------
    // Error accumulation
    // -----------------------------------------------------------------------

    #[inline]
    pub fn sink(&self) -> &ErrorSink {
        &self.sink
    }

    #[inline]
    pub fn sink_mut(&mut self) -> &mut ErrorSink {
        &mut self.sink
    }

    /// Take the accumulated errors, leaving the sink empty.
    pub fn take_errors(&mut self) -> Vec<wyre_common::ResolutionError> {
        self.sink.take()
    }
}

impl Default for ConstructionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wyre_common::{InjectStage, Source};

    const FID: FactoryId = FactoryId(1);

    #[test]
    fn reentry_reports_in_progress() {
        let mut ctx = ConstructionContext::new();
        assert!(matches!(ctx.try_start(FID), TryStart::Entered));
        assert!(matches!(
            ctx.try_start(FID),
            TryStart::InProgress { partial: None }
        ));
    }

    #[test]
    fn partial_is_visible_to_reentrant_requests() {
        let mut ctx = ConstructionContext::new();
        ctx.try_start(FID);
        ctx.set_partial(FID, Arc::new(5u32));
        match ctx.try_start(FID) {
            TryStart::InProgress { partial: Some(p) } => {
                assert_eq!(*p.downcast::<u32>().unwrap(), 5);
            }
            other => panic!("expected partial, got {other:?}"),
        }
    }

    #[test]
    fn finish_binds_issued_proxies() {
        let mut ctx = ConstructionContext::new();
        ctx.try_start(FID);
        let handle = ctx.issue_proxy(FID, Key::of::<u32>());
        assert!(handle.resolve().is_none());

        ctx.finish(FID, Some(Arc::new(11u32)));
        assert_eq!(*handle.downcast::<u32>().unwrap(), 11);
    }

    #[test]
    fn abort_leaves_proxies_unbound() {
        let mut ctx = ConstructionContext::new();
        ctx.try_start(FID);
        let handle = ctx.issue_proxy(FID, Key::of::<u32>());
        ctx.abort(FID);
        assert!(handle.resolve().is_none());
    }

    #[test]
    fn finish_clears_for_reuse() {
        let mut ctx = ConstructionContext::new();
        ctx.try_start(FID);
        ctx.finish(FID, Some(Arc::new(1u32)));
        // A later independent request constructs afresh.
        assert!(matches!(ctx.try_start(FID), TryStart::Entered));
    }

    #[test]
    fn chain_snapshots_preserve_order() {
        let mut ctx = ConstructionContext::new();
        ctx.push_frame(ChainFrame {
            key: Key::of::<String>(),
            source: Source::unknown(),
            stage: InjectStage::Constructor,
        });
        ctx.push_frame(ChainFrame {
            key: Key::of::<u32>(),
            source: Source::unknown(),
            stage: InjectStage::Member,
        });
        assert_eq!(ctx.chain().to_string(), "String -> u32");
        ctx.pop_frame();
        assert_eq!(ctx.chain().to_string(), "String");
    }
}
