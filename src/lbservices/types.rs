//! The `lb-services` payload shape.
//!
//! All maps are ordered so two builds over the same registry serialize to
//! identical bytes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Load-balancer routing table for the whole registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbServicesConfig {
    /// Tenants keyed by tenant name.
    #[serde(default)]
    pub tenants: BTreeMap<String, LbTenant>,
}

/// One tenant of the routing table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbTenant {
    /// Applications keyed by `application:environment:region:instance`.
    #[serde(default)]
    pub applications: BTreeMap<String, LbApplication>,
}

/// One application of the routing table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbApplication {
    /// Deploy generation of the application.
    #[serde(default)]
    pub generation: u64,
    /// Hosts keyed by hostname.
    #[serde(default)]
    pub hosts: BTreeMap<String, LbHost>,
}

/// One host of an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbHost {
    /// Hostname, repeated from the map key.
    pub hostname: String,
    /// Services keyed by service name.
    #[serde(default)]
    pub services: BTreeMap<String, LbService>,
}

/// One service on a host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbService {
    /// Service type.
    #[serde(rename = "type")]
    pub service_type: String,
    /// Position among services of the same type on this host, from 0.
    pub index: u32,
    /// Config id of the service.
    #[serde(default)]
    pub config_id: String,
    /// Exposed ports.
    #[serde(default)]
    pub ports: Vec<LbPort>,
}

/// One exposed port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LbPort {
    /// Port number.
    pub number: u16,
    /// Port tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl LbServicesConfig {
    /// Looks up a tenant.
    #[must_use]
    pub fn tenant(&self, name: &str) -> Option<&LbTenant> {
        self.tenants.get(name)
    }

    /// Total number of applications across tenants.
    #[must_use]
    pub fn application_count(&self) -> usize {
        self.tenants.values().map(|t| t.applications.len()).sum()
    }
}

impl LbTenant {
    /// Looks up an application by its zone-qualified key.
    #[must_use]
    pub fn application(&self, key: &str) -> Option<&LbApplication> {
        self.applications.get(key)
    }
}
