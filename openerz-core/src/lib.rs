//! Core types and engines for OpenERZ waste collection: the jurisdiction
//! wizard, canonical naming, and per-stream pickup scheduling.

/// Domain models and identifiers.
pub mod model;
/// Label normalization for catalog tokens.
pub mod normalize;
/// Traits describing the catalog interface.
pub mod ports;
/// Host-owned registry of configured entries.
pub mod registry;
/// Canonical identity of jurisdictions.
pub mod resolver;
/// Per-jurisdiction pickup scheduling.
pub mod scheduler;
/// High-level service facade used by hosts.
pub mod service;
/// Static catalog of known waste streams.
pub mod streams;
/// Region → area → types selection flow.
pub mod wizard;

#[cfg(test)]
mod testing;

pub use model::*;
pub use ports::*;
pub use registry::*;
pub use scheduler::*;
pub use service::*;
pub use wizard::*;
