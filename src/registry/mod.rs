//! Registry module (the super model).
//!
//! This module owns the only mutable shared state of the server:
//! - Copy-on-write snapshots of tenant → application mappings
//! - Serialized `put`/`remove` with a generation counter and wake-ups
//! - Read-only counters for operational reporting

mod snapshot;
mod stats;
mod super_model;

pub use snapshot::RegistrySnapshot;
pub use stats::{RegistryStats, StatusReport};
pub use super_model::SuperModel;
