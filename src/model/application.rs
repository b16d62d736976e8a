//! Application models as seen by the config server.
//!
//! Building a model from an application package happens elsewhere. Here a
//! model is only a capability: it describes the hosts, services and ports of
//! one deployment, and can produce a payload for a `(config id, schema)` pair
//! or say the pair is not applicable.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::catalog::ConfigDefinitionKey;
use crate::error::ConfigError;
use crate::resolver::ConfigKey;

use super::ids::ApplicationId;

/// A network port exposed by a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Port number.
    pub number: u16,
    /// Free-form tags such as `http`, `rpc` or `admin`.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A service running on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name, unique on its host.
    pub name: String,
    /// Service type, e.g. `qrserver` or `searchnode`.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Config id the service subscribes with.
    pub config_id: String,
    /// Ports the service listens on.
    #[serde(default)]
    pub ports: Vec<PortInfo>,
}

/// A host an application is deployed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    /// Fully qualified hostname.
    pub hostname: String,
    /// Services in declaration order.
    #[serde(default)]
    pub services: Vec<ServiceInfo>,
}

/// Capability contract of a deployed application's model.
pub trait ApplicationModel: Send + Sync + fmt::Debug {
    /// Hosts of this deployment, in a deterministic order.
    fn hosts(&self) -> &[HostInfo];

    /// Config ids this model answers for.
    fn config_ids(&self) -> Vec<String>;

    /// Produces the payload of `key`'s schema for `key`'s config id.
    ///
    /// Returns `None` when the pair is not applicable to this model.
    fn resolve(&self, key: &ConfigKey) -> Option<Value>;
}

/// A deployed application: identity, deploy generation and model.
#[derive(Debug, Clone)]
pub struct ApplicationInfo {
    id: ApplicationId,
    generation: u64,
    model: Arc<dyn ApplicationModel>,
}

impl ApplicationInfo {
    /// Creates a new application entry.
    #[must_use]
    pub fn new(id: ApplicationId, generation: u64, model: Arc<dyn ApplicationModel>) -> Self {
        Self {
            id,
            generation,
            model,
        }
    }

    /// Returns the application id.
    #[must_use]
    pub const fn id(&self) -> &ApplicationId {
        &self.id
    }

    /// Returns the generation assigned at deploy time.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the application model.
    #[must_use]
    pub fn model(&self) -> &dyn ApplicationModel {
        self.model.as_ref()
    }
}

/// An application model assembled from explicit host and payload data.
///
/// Used for deployment manifests and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticApplicationModel {
    hosts: Vec<HostInfo>,
    /// Explicit payloads, keyed by config id and then by definition key.
    configs: BTreeMap<String, BTreeMap<ConfigDefinitionKey, Value>>,
}

impl StaticApplicationModel {
    /// Creates a model from its hosts.
    ///
    /// # Errors
    ///
    /// Returns an error if a hostname repeats or a service name repeats on a host.
    pub fn new(hosts: Vec<HostInfo>) -> Result<Self, ConfigError> {
        let mut seen_hosts = HashSet::new();
        for host in &hosts {
            if !seen_hosts.insert(host.hostname.as_str()) {
                return Err(ConfigError::DuplicateName {
                    resource_type: String::from("host"),
                    name: host.hostname.clone(),
                });
            }

            let mut seen_services = HashSet::new();
            for service in &host.services {
                if !seen_services.insert(service.name.as_str()) {
                    return Err(ConfigError::DuplicateName {
                        resource_type: String::from("service"),
                        name: format!("{}/{}", host.hostname, service.name),
                    });
                }
            }
        }

        Ok(Self {
            hosts,
            configs: BTreeMap::new(),
        })
    }

    /// Adds an explicit payload for a config id and schema.
    #[must_use]
    pub fn with_config(
        mut self,
        config_id: impl Into<String>,
        definition: ConfigDefinitionKey,
        payload: Value,
    ) -> Self {
        self.configs
            .entry(config_id.into())
            .or_default()
            .insert(definition, payload);
        self
    }
}

impl ApplicationModel for StaticApplicationModel {
    fn hosts(&self) -> &[HostInfo] {
        &self.hosts
    }

    fn config_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .hosts
            .iter()
            .flat_map(|h| h.services.iter().map(|s| s.config_id.clone()))
            .chain(self.configs.keys().cloned())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    fn resolve(&self, key: &ConfigKey) -> Option<Value> {
        self.configs
            .get(key.config_id())
            .and_then(|by_def| by_def.get(key.definition()))
            .cloned()
    }
}
