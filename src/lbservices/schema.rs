//! Typed schema for `cloud.config.lb-services`.

use serde_json::Value;

use crate::catalog::{ConfigDefinitionKey, ConfigSchema};
use crate::encoder::PayloadHasher;
use crate::error::ResolveError;

use super::types::LbServicesConfig;
use super::{LB_SERVICES_NAME, LB_SERVICES_NAMESPACE};

const LB_SERVICES_DEF: &str = "\
namespace=cloud.config
tenants{}.applications{}.generation long default=0
tenants{}.applications{}.hosts{}.hostname string default=\"(unknownhostname)\"
tenants{}.applications{}.hosts{}.services{}.type string default=\"(noservicetype)\"
tenants{}.applications{}.hosts{}.services{}.index int default=0
tenants{}.applications{}.hosts{}.services{}.config_id string default=\"\"
tenants{}.applications{}.hosts{}.services{}.ports[].number int
tenants{}.applications{}.hosts{}.services{}.ports[].tags[] string
";

/// Schema of the aggregated load-balancer routing table.
///
/// Payloads must deserialize into [`LbServicesConfig`]; the canonical form is
/// the serialization of that typed value.
#[derive(Debug, Clone)]
pub struct LbServicesSchema {
    key: ConfigDefinitionKey,
    definition_checksum: String,
}

impl LbServicesSchema {
    /// Creates the schema.
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: Self::definition_key(),
            definition_checksum: PayloadHasher::hash_bytes(LB_SERVICES_DEF.as_bytes()),
        }
    }

    /// The key resolution requests use to ask for the aggregated view.
    #[must_use]
    pub fn definition_key() -> ConfigDefinitionKey {
        ConfigDefinitionKey::new(LB_SERVICES_NAME, LB_SERVICES_NAMESPACE)
    }

    fn typed(&self, payload: Value) -> Result<LbServicesConfig, ResolveError> {
        serde_json::from_value(payload)
            .map_err(|e| ResolveError::encoding(format!("{}: {e}", self.key)))
    }
}

impl Default for LbServicesSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSchema for LbServicesSchema {
    fn key(&self) -> &ConfigDefinitionKey {
        &self.key
    }

    fn definition_checksum(&self) -> &str {
        &self.definition_checksum
    }

    fn defaults(&self) -> Option<Value> {
        serde_json::to_value(LbServicesConfig::default()).ok()
    }

    fn encode(&self, payload: &Value) -> Result<Vec<u8>, ResolveError> {
        let typed = self.typed(payload.clone())?;
        serde_json::to_vec(&typed).map_err(|e| ResolveError::encoding(format!("{}: {e}", self.key)))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, ResolveError> {
        let typed: LbServicesConfig = serde_json::from_slice(bytes)
            .map_err(|e| ResolveError::encoding(format!("{}: {e}", self.key)))?;
        serde_json::to_value(typed)
            .map_err(|e| ResolveError::encoding(format!("{}: {e}", self.key)))
    }
}
