//! Binding resolution and cycle construction engine for the wyre runtime.
//!
//! This crate implements the resolution algorithm over the storage in
//! `wyre-registry`:
//!
//! - **Construction context**: explicit per-call re-entrancy state —
//!   cycle detection as a pure function of passed-in state.
//! - **Provisioning**: the recursive key-to-instance algorithm with
//!   sibling error aggregation and per-chain short-circuiting.
//! - **Scope application**: singleton first-use linearization per tree.
//!
//! The one entry point hosts call is [`provide`].

mod apply;
pub mod context;
mod provision;

pub use context::{ConstructionContext, TryStart};
pub use provision::provide;
