//! The config definition catalog.
//!
//! Maps `(name, namespace)` to the schema that serves it. Built once at
//! startup and shared read-only afterwards.

use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{CatalogError, ResolveError};
use crate::lbservices::LbServicesSchema;

use super::definition::{ConfigDefinitionKey, ConfigSchema, JsonSchema};

const SENTINEL_DEF: &str = "\
namespace=cloud.config
service[].name string
service[].command string
service[].preShutdownCommand string default=\"\"
service[].autostart bool default=true
service[].autorestart bool default=true
";

const QR_SEARCHERS_DEF: &str = "\
namespace=container
tag.bold.open string default=\"<hi>\"
tag.bold.close string default=\"</hi>\"
tag.separator string default=\"<sep />\"
";

/// Registry of the schemas this server understands.
#[derive(Debug, Default, Clone)]
pub struct ConfigDefinitionCatalog {
    schemas: HashMap<ConfigDefinitionKey, Arc<dyn ConfigSchema>>,
}

impl ConfigDefinitionCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in schemas:
    /// `cloud.config.lb-services`, `cloud.config.sentinel` and
    /// `container.qr-searchers`.
    #[must_use]
    pub fn builtin() -> Self {
        let mut schemas: HashMap<ConfigDefinitionKey, Arc<dyn ConfigSchema>> = HashMap::new();

        let builtins: [Arc<dyn ConfigSchema>; 3] = [
            Arc::new(LbServicesSchema::new()),
            Arc::new(
                JsonSchema::new(ConfigDefinitionKey::new("sentinel", "cloud.config"), SENTINEL_DEF)
                    .with_required_field("service")
                    .with_defaults(json!({ "service": [] })),
            ),
            Arc::new(
                JsonSchema::new(
                    ConfigDefinitionKey::new("qr-searchers", "container"),
                    QR_SEARCHERS_DEF,
                )
                .with_defaults(json!({
                    "tag": {
                        "bold": { "open": "<hi>", "close": "</hi>" },
                        "separator": "<sep />"
                    }
                })),
            ),
        ];

        for schema in builtins {
            schemas.insert(schema.key().clone(), schema);
        }

        Self { schemas }
    }

    /// Registers a schema.
    ///
    /// # Errors
    ///
    /// Returns an error if a schema with the same key is already registered.
    pub fn register(&mut self, schema: Arc<dyn ConfigSchema>) -> Result<(), CatalogError> {
        let key = schema.key().clone();
        if self.schemas.contains_key(&key) {
            return Err(CatalogError::DuplicateDefinition {
                key: key.to_string(),
            });
        }

        debug!(definition = %key, "Registered config definition");
        self.schemas.insert(key, schema);
        Ok(())
    }

    /// Looks up a schema by name and namespace.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownSchema`] if no schema is registered.
    pub fn lookup(&self, key: &ConfigDefinitionKey) -> Result<Arc<dyn ConfigSchema>, ResolveError> {
        self.schemas
            .get(key)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownSchema {
                name: key.name.clone(),
                namespace: key.namespace.clone(),
            })
    }

    /// Looks up a schema and checks the caller's definition checksum.
    ///
    /// An empty `definition_checksum` skips the comparison.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::UnknownSchema`] if no schema is registered, or
    /// [`ResolveError::SchemaMismatch`] if the checksums differ.
    pub fn lookup_checked(
        &self,
        key: &ConfigDefinitionKey,
        definition_checksum: &str,
    ) -> Result<Arc<dyn ConfigSchema>, ResolveError> {
        let schema = self.lookup(key)?;

        if !definition_checksum.is_empty() && definition_checksum != schema.definition_checksum() {
            return Err(ResolveError::SchemaMismatch {
                name: key.name.clone(),
                namespace: key.namespace.clone(),
                client_checksum: definition_checksum.to_string(),
                server_checksum: schema.definition_checksum().to_string(),
            });
        }

        Ok(schema)
    }

    /// Returns all registered keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<ConfigDefinitionKey> {
        let mut keys: Vec<_> = self.schemas.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns true if no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
