//! The super model: live registry of every tenant and application.
//!
//! Readers take an `Arc` snapshot in O(1) and never block. Writers are
//! serialized, build a new snapshot from the current one, swap it in and
//! publish the new generation to every long-poll waiter.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::RegistryError;
use crate::model::{ApplicationId, ApplicationInfo, TenantName};

use super::snapshot::{RegistrySnapshot, TenantMap};
use super::stats::RegistryStats;

/// Registry of all live deployments in the cluster.
#[derive(Debug)]
pub struct SuperModel {
    current: ArcSwap<RegistrySnapshot>,
    /// Serializes writers; readers never take it.
    write_lock: Mutex<()>,
    generation_tx: watch::Sender<u64>,
}

impl SuperModel {
    /// Creates an empty registry at generation 0.
    #[must_use]
    pub fn new() -> Self {
        let (generation_tx, _) = watch::channel(0);
        Self {
            current: ArcSwap::from_pointee(RegistrySnapshot::default()),
            write_lock: Mutex::new(()),
            generation_tx,
        }
    }

    /// Returns the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.load_full()
    }

    /// Returns the current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.current.load().generation()
    }

    /// Subscribes to generation changes.
    ///
    /// The receiver observes every generation published after this call.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation_tx.subscribe()
    }

    /// Deploys or redeploys an application under `tenant`.
    ///
    /// Returns the new registry generation.
    ///
    /// # Errors
    ///
    /// Returns an error if the application id belongs to another tenant, or if
    /// a redeploy carries an older deploy generation than the live one. The
    /// registry is unchanged on error.
    pub fn put(&self, tenant: &TenantName, info: ApplicationInfo) -> Result<u64, RegistryError> {
        if info.id().tenant() != tenant {
            return Err(RegistryError::TenantMismatch {
                tenant: tenant.to_string(),
                application: info.id().serialized_form(),
            });
        }

        let _guard = self.write_lock.lock();
        let current = self.current.load_full();

        if let Some(existing) = current.get(info.id()) {
            if info.generation() < existing.generation() {
                return Err(RegistryError::StaleGeneration {
                    application: info.id().serialized_form(),
                    current: existing.generation(),
                    offered: info.generation(),
                });
            }
        }

        let application = info.id().serialized_form();
        let deploy_generation = info.generation();

        let mut tenants = current.tenants_for_update();
        let replaced = tenants
            .entry(tenant.clone())
            .or_default()
            .insert(info.id().clone(), info)
            .is_some();

        let generation = self.publish(&current, tenants);
        info!(
            application = %application,
            deploy_generation,
            generation,
            replaced,
            "Application deployed to super model"
        );
        Ok(generation)
    }

    /// Removes an application.
    ///
    /// Returns `false` without bumping the generation if it was not deployed.
    ///
    /// # Errors
    ///
    /// Returns an error if the application id belongs to another tenant.
    pub fn remove(&self, tenant: &TenantName, id: &ApplicationId) -> Result<bool, RegistryError> {
        if id.tenant() != tenant {
            return Err(RegistryError::TenantMismatch {
                tenant: tenant.to_string(),
                application: id.serialized_form(),
            });
        }

        let _guard = self.write_lock.lock();
        let current = self.current.load_full();

        if current.get(id).is_none() {
            debug!(application = %id, "Remove of unknown application ignored");
            return Ok(false);
        }

        let mut tenants = current.tenants_for_update();
        if let Some(apps) = tenants.get_mut(tenant) {
            apps.remove(id);
            if apps.is_empty() {
                tenants.remove(tenant);
            }
        }

        let generation = self.publish(&current, tenants);
        info!(application = %id, generation, "Application removed from super model");
        Ok(true)
    }

    /// Returns read-only counters for operational reporting.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats::from_snapshot(&self.current.load())
    }

    /// Swaps in a new snapshot one generation past `current` and wakes waiters.
    ///
    /// Must be called with the write lock held.
    fn publish(&self, current: &RegistrySnapshot, tenants: TenantMap) -> u64 {
        let generation = current.generation() + 1;
        self.current
            .store(Arc::new(RegistrySnapshot::build(generation, tenants)));
        self.generation_tx.send_replace(generation);
        generation
    }
}

impl Default for SuperModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{
        ApplicationName, HostInfo, InstanceName, ServiceInfo, StaticApplicationModel,
    };

    fn app_id(tenant: &str, application: &str) -> ApplicationId {
        ApplicationId::new(
            TenantName::new(tenant).unwrap(),
            ApplicationName::new(application).unwrap(),
            InstanceName::default_name(),
        )
    }

    fn app(tenant: &str, application: &str, generation: u64, hostname: &str) -> ApplicationInfo {
        let host = HostInfo {
            hostname: hostname.to_string(),
            services: vec![ServiceInfo {
                name: String::from("qrserver"),
                service_type: String::from("qrserver"),
                config_id: format!("{application}/container.0"),
                ports: vec![],
            }],
        };
        ApplicationInfo::new(
            app_id(tenant, application),
            generation,
            Arc::new(StaticApplicationModel::new(vec![host]).unwrap()),
        )
    }

    #[test]
    fn test_put_is_visible_and_bumps_generation() {
        let registry = SuperModel::new();
        let t1 = TenantName::new("t1").unwrap();
        assert_eq!(registry.generation(), 0);

        assert_eq!(registry.put(&t1, app("t1", "mysimpleapp", 4, "h1")).unwrap(), 1);
        assert_eq!(registry.put(&t1, app("t1", "myadvancedapp", 4, "h2")).unwrap(), 2);

        let snapshot = registry.snapshot();
        let names: Vec<String> = snapshot
            .applications_of(&t1)
            .map(|info| info.id().application().to_string())
            .collect();
        assert_eq!(names, vec!["myadvancedapp", "mysimpleapp"]);
        assert_eq!(snapshot.generation(), 2);
    }

    #[test]
    fn test_snapshots_are_immutable() {
        let registry = SuperModel::new();
        let t1 = TenantName::new("t1").unwrap();
        registry.put(&t1, app("t1", "a", 1, "h1")).unwrap();

        let before = registry.snapshot();
        registry.put(&t1, app("t1", "b", 1, "h2")).unwrap();

        assert_eq!(before.application_count(), 1);
        assert_eq!(registry.snapshot().application_count(), 2);
    }

    #[test]
    fn test_tenant_mismatch_rejected() {
        let registry = SuperModel::new();
        let t2 = TenantName::new("t2").unwrap();

        let result = registry.put(&t2, app("t1", "a", 1, "h1"));
        assert!(matches!(result, Err(RegistryError::TenantMismatch { .. })));
        assert_eq!(registry.generation(), 0);
        assert_eq!(registry.stats().applications, 0);
    }

    #[test]
    fn test_redeploy_replaces_and_stale_generation_rejected() {
        let registry = SuperModel::new();
        let t1 = TenantName::new("t1").unwrap();
        registry.put(&t1, app("t1", "a", 5, "h1")).unwrap();
        registry.put(&t1, app("t1", "a", 6, "h9")).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.application_count(), 1);
        assert_eq!(snapshot.get(&app_id("t1", "a")).unwrap().generation(), 6);

        let stale = registry.put(&t1, app("t1", "a", 3, "h1"));
        assert!(matches!(stale, Err(RegistryError::StaleGeneration { current: 6, .. })));
        assert_eq!(registry.generation(), 2);
    }

    #[test]
    fn test_remove_drops_empty_tenant() {
        let registry = SuperModel::new();
        let t1 = TenantName::new("t1").unwrap();
        registry.put(&t1, app("t1", "a", 1, "h1")).unwrap();

        assert!(registry.remove(&t1, &app_id("t1", "a")).unwrap());
        assert_eq!(registry.generation(), 2);
        assert_eq!(registry.snapshot().tenant_count(), 0);

        assert!(!registry.remove(&t1, &app_id("t1", "a")).unwrap());
        assert_eq!(registry.generation(), 2);
    }

    #[test]
    fn test_all_applications_visits_each_once() {
        let registry = SuperModel::new();
        let t1 = TenantName::new("t1").unwrap();
        let t2 = TenantName::new("t2").unwrap();
        registry.put(&t1, app("t1", "a", 1, "h1")).unwrap();
        registry.put(&t1, app("t1", "b", 1, "h2")).unwrap();
        registry.put(&t2, app("t2", "a", 1, "h3")).unwrap();

        let snapshot = registry.snapshot();
        let visited: Vec<String> = snapshot
            .all_applications()
            .map(|(_, info)| info.id().serialized_form())
            .collect();
        assert_eq!(visited, vec!["t1:a:default", "t1:b:default", "t2:a:default"]);
    }

    #[test]
    fn test_owner_lookup() {
        let registry = SuperModel::new();
        let t1 = TenantName::new("t1").unwrap();
        let t2 = TenantName::new("t2").unwrap();
        registry.put(&t1, app("t1", "a", 1, "h1")).unwrap();
        registry.put(&t2, app("t2", "a", 1, "h2")).unwrap();
        registry.put(&t2, app("t2", "b", 1, "h3")).unwrap();

        let snapshot = registry.snapshot();

        let by_host = snapshot.owner_of("a/container.0", Some("h2")).unwrap();
        assert_eq!(by_host.id().serialized_form(), "t2:a:default");

        let ambiguous = snapshot.owner_of("a/container.0", None).unwrap_err();
        assert_eq!(ambiguous.kind(), ErrorKind::NoSuchConfigId);

        let unique = snapshot.owner_of("b/container.0", Some("unknown-host")).unwrap();
        assert_eq!(unique.id().serialized_form(), "t2:b:default");

        assert!(snapshot.owner_of("c/container.0", None).is_err());
        assert!(snapshot.owner_of("c/container.0", Some("h3")).is_err());
        assert!(snapshot.owner_of("a/container.0", Some("h3")).is_err());
    }

    #[tokio::test]
    async fn test_subscribers_see_new_generation() {
        let registry = SuperModel::new();
        let mut rx = registry.subscribe();
        let t1 = TenantName::new("t1").unwrap();

        registry.put(&t1, app("t1", "a", 1, "h1")).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);
    }
}
