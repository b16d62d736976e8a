//! Config definitions and the per-schema capability.
//!
//! Every schema the server can serve implements [`ConfigSchema`]. Payloads are
//! opaque `serde_json::Value`s; a schema knows how to encode one into its
//! canonical bytes, decode it back and checksum it. New schemas are added by
//! providing a new implementation and registering it in the catalog.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::encoder::PayloadHasher;
use crate::error::ResolveError;

/// Identity of a schema: `(name, namespace)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigDefinitionKey {
    /// Schema name, e.g. `lb-services`.
    pub name: String,
    /// Schema namespace, e.g. `cloud.config`.
    pub namespace: String,
}

impl ConfigDefinitionKey {
    /// Creates a definition key.
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl fmt::Display for ConfigDefinitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Capability implemented once per schema.
pub trait ConfigSchema: Send + Sync + fmt::Debug {
    /// The schema identity.
    fn key(&self) -> &ConfigDefinitionKey;

    /// Checksum of the schema definition, compared against the one callers send.
    fn definition_checksum(&self) -> &str;

    /// Payload served when an owning model has nothing explicit for a config id.
    fn defaults(&self) -> Option<Value> {
        None
    }

    /// Encodes a payload into its canonical, uncompressed bytes.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the payload does not fit the schema.
    fn encode(&self, payload: &Value) -> Result<Vec<u8>, ResolveError> {
        serde_json::to_vec(payload)
            .map_err(|e| ResolveError::encoding(format!("{}: {e}", self.key())))
    }

    /// Decodes canonical bytes back into a payload.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the bytes are not a valid payload.
    fn decode(&self, bytes: &[u8]) -> Result<Value, ResolveError> {
        serde_json::from_slice(bytes)
            .map_err(|e| ResolveError::encoding(format!("{}: {e}", self.key())))
    }

    /// Checksum of a payload's canonical bytes, as produced by [`Self::encode`].
    fn checksum(&self, canonical: &[u8]) -> String {
        PayloadHasher::hash_bytes(canonical)
    }
}

/// A schema whose payload is a JSON object carrying a fixed set of top-level
/// fields.
#[derive(Debug, Clone)]
pub struct JsonSchema {
    key: ConfigDefinitionKey,
    definition_checksum: String,
    required_fields: Vec<String>,
    defaults: Option<Value>,
}

impl JsonSchema {
    /// Creates a schema from its definition text.
    ///
    /// The definition checksum is the hash of `definition`.
    #[must_use]
    pub fn new(key: ConfigDefinitionKey, definition: &str) -> Self {
        Self {
            key,
            definition_checksum: PayloadHasher::hash_bytes(definition.as_bytes()),
            required_fields: Vec::new(),
            defaults: None,
        }
    }

    /// Requires a top-level field in every payload.
    #[must_use]
    pub fn with_required_field(mut self, field: impl Into<String>) -> Self {
        self.required_fields.push(field.into());
        self
    }

    /// Sets the payload served when a model has nothing explicit.
    #[must_use]
    pub fn with_defaults(mut self, defaults: Value) -> Self {
        self.defaults = Some(defaults);
        self
    }

    fn check_fields(&self, payload: &Value) -> Result<(), ResolveError> {
        let Some(object) = payload.as_object() else {
            return Err(ResolveError::encoding(format!(
                "{}: payload must be an object",
                self.key
            )));
        };

        match self.required_fields.iter().find(|f| !object.contains_key(*f)) {
            Some(missing) => Err(ResolveError::encoding(format!(
                "{}: missing required field '{missing}'",
                self.key
            ))),
            None => Ok(()),
        }
    }
}

impl ConfigSchema for JsonSchema {
    fn key(&self) -> &ConfigDefinitionKey {
        &self.key
    }

    fn definition_checksum(&self) -> &str {
        &self.definition_checksum
    }

    fn defaults(&self) -> Option<Value> {
        self.defaults.clone()
    }

    fn encode(&self, payload: &Value) -> Result<Vec<u8>, ResolveError> {
        self.check_fields(payload)?;
        serde_json::to_vec(payload)
            .map_err(|e| ResolveError::encoding(format!("{}: {e}", self.key)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, ResolveError> {
        let payload: Value = serde_json::from_slice(bytes)
            .map_err(|e| ResolveError::encoding(format!("{}: {e}", self.key)))?;
        self.check_fields(&payload)?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sentinel() -> JsonSchema {
        JsonSchema::new(
            ConfigDefinitionKey::new("sentinel", "cloud.config"),
            "namespace=cloud.config\nservice[].name string\n",
        )
        .with_required_field("service")
    }

    #[test]
    fn test_definition_key_display() {
        let key = ConfigDefinitionKey::new("lb-services", "cloud.config");
        assert_eq!(key.to_string(), "cloud.config.lb-services");
    }

    #[test]
    fn test_checksum_ignores_key_order() {
        let schema = sentinel();
        let a = json!({"service": [], "application": {"tenant": "t1", "name": "app"}});
        let b = json!({"application": {"name": "app", "tenant": "t1"}, "service": []});

        let checksum = |payload: &Value| schema.checksum(&schema.encode(payload).unwrap());

        assert_eq!(checksum(&a), checksum(&b));
        assert_ne!(checksum(&a), checksum(&json!({"service": [1]})));
    }

    #[test]
    fn test_required_field_enforced() {
        let schema = sentinel();
        assert!(schema.encode(&json!({"other": 1})).is_err());
        assert!(schema.encode(&json!([1, 2])).is_err());
        assert!(schema.decode(br#"{"other": 1}"#).is_err());

        let bytes = schema.encode(&json!({"service": []})).unwrap();
        assert_eq!(schema.decode(&bytes).unwrap(), json!({"service": []}));
    }

    #[test]
    fn test_definition_checksum_tracks_text() {
        let a = JsonSchema::new(ConfigDefinitionKey::new("x", "y"), "a int");
        let b = JsonSchema::new(ConfigDefinitionKey::new("x", "y"), "a long");
        assert_ne!(a.definition_checksum(), b.definition_checksum());
        assert_eq!(a.definition_checksum().len(), 64);
    }
}
