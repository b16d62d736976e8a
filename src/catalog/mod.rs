//! Config definition catalog module.
//!
//! This module decides whether a request names a schema the server
//! understands:
//! - Schema identities and the per-schema encode/decode/checksum capability
//! - The catalog mapping `(name, namespace)` to a schema

mod definition;
mod repo;

pub use definition::{ConfigDefinitionKey, ConfigSchema, JsonSchema};
pub use repo::ConfigDefinitionCatalog;
