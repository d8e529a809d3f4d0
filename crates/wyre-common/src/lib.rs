//! Common types and utilities for the wyre resolution runtime.
//!
//! This crate provides foundational types used across all wyre crates:
//! - Lookup keys (`TypeTag`, `Key`)
//! - Declaration-site provenance (`Source`)
//! - Engine configuration (`EngineConfig`)
//! - Instances and deferred handles (`Instance`, `Handle`, `DeferredCell`)
//! - The error taxonomy and dependency-chain diagnostics
//! - Structured error accumulation (`ErrorSink`)

// Lookup keys - type descriptor plus optional qualifier
pub mod key;
pub use key::{Key, TypeTag};

// Declaration-site provenance for diagnostics
pub mod source;
pub use source::Source;

// Engine configuration captured at scope-tree creation
pub mod config;
pub use config::EngineConfig;

// Instances and direct/deferred handles
pub mod handle;
pub use handle::{DeferredCell, Handle, Instance};

// Error taxonomy and dependency chains
pub mod errors;
pub use errors::{
    BindingError, ChainFrame, CycleReason, DependencyChain, InjectStage, ProvisionFault,
    ResolutionError, ResolutionErrors,
};

// Structured error accumulation
pub mod sink;
pub use sink::ErrorSink;
