//! Immutable registry snapshots.
//!
//! A snapshot is the whole tenant → application mapping at one generation.
//! It is never modified after being published; mutations build a new one.

use std::collections::{BTreeMap, HashMap};

use crate::error::ResolveError;
use crate::model::{ApplicationId, ApplicationInfo, TenantName};

/// Tenant → application id → application.
pub(super) type TenantMap = BTreeMap<TenantName, BTreeMap<ApplicationId, ApplicationInfo>>;

/// Consistent view of every live deployment.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    generation: u64,
    tenants: TenantMap,
    /// Hostname → applications deployed on it.
    hosts: HashMap<String, Vec<ApplicationId>>,
    /// Config id → applications whose model lists it.
    config_ids: HashMap<String, Vec<ApplicationId>>,
}

impl RegistrySnapshot {
    /// Creates a snapshot and indexes hosts and config ids.
    pub(super) fn build(generation: u64, tenants: TenantMap) -> Self {
        let mut hosts: HashMap<String, Vec<ApplicationId>> = HashMap::new();
        let mut config_ids: HashMap<String, Vec<ApplicationId>> = HashMap::new();

        for info in tenants.values().flat_map(BTreeMap::values) {
            for host in info.model().hosts() {
                hosts
                    .entry(host.hostname.clone())
                    .or_default()
                    .push(info.id().clone());
            }
            for config_id in info.model().config_ids() {
                config_ids.entry(config_id).or_default().push(info.id().clone());
            }
        }

        Self {
            generation,
            tenants,
            hosts,
            config_ids,
        }
    }

    /// Clones the tenant mapping for a copy-on-write mutation.
    pub(super) fn tenants_for_update(&self) -> TenantMap {
        self.tenants.clone()
    }

    /// Registry generation this snapshot was published at.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of tenants with at least one application.
    #[must_use]
    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    /// Number of applications across all tenants.
    #[must_use]
    pub fn application_count(&self) -> usize {
        self.tenants.values().map(BTreeMap::len).sum()
    }

    /// Tenants in name order.
    pub fn tenants(&self) -> impl Iterator<Item = &TenantName> {
        self.tenants.keys()
    }

    /// Applications of one tenant, in application id order.
    pub fn applications_of<'a>(
        &'a self,
        tenant: &TenantName,
    ) -> impl Iterator<Item = &'a ApplicationInfo> + use<'a> {
        self.tenants
            .get(tenant)
            .into_iter()
            .flat_map(BTreeMap::values)
    }

    /// Every application of every tenant, each exactly once.
    pub fn all_applications(&self) -> impl Iterator<Item = (&TenantName, &ApplicationInfo)> {
        self.tenants
            .iter()
            .flat_map(|(tenant, apps)| apps.values().map(move |info| (tenant, info)))
    }

    /// Looks up one application.
    #[must_use]
    pub fn get(&self, id: &ApplicationId) -> Option<&ApplicationInfo> {
        self.tenants.get(id.tenant()).and_then(|apps| apps.get(id))
    }

    /// Finds the application owning `config_id`.
    ///
    /// The config id must be listed by some application. When several list
    /// it, `client_host` picks the one deployed on that host.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoSuchConfigId`] if no single owner exists.
    pub fn owner_of(
        &self,
        config_id: &str,
        client_host: Option<&str>,
    ) -> Result<&ApplicationInfo, ResolveError> {
        let claimants = match self.config_ids.get(config_id).map(Vec::as_slice) {
            None | Some([]) => {
                return Err(ResolveError::no_such_config_id(
                    config_id,
                    "no deployed application claims it",
                ));
            }
            Some([id]) => {
                return self.get(id).ok_or_else(|| {
                    ResolveError::no_such_config_id(config_id, "owner index is stale")
                });
            }
            Some(ids) => ids,
        };

        let on_host: Vec<&ApplicationId> = client_host
            .and_then(|host| self.hosts.get(host))
            .map(|deployed| claimants.iter().filter(|id| deployed.contains(id)).collect())
            .unwrap_or_default();

        match on_host.as_slice() {
            [id] => self.get(id).ok_or_else(|| {
                ResolveError::no_such_config_id(config_id, "owner index is stale")
            }),
            _ => Err(ResolveError::no_such_config_id(
                config_id,
                format!("claimed by {} applications, client host required", claimants.len()),
            )),
        }
    }
}
