//! Builds the `lb-services` view from a registry snapshot.

use std::collections::HashMap;
use tracing::debug;

use crate::model::{HostInfo, Zone};
use crate::registry::RegistrySnapshot;

use super::types::{LbApplication, LbHost, LbPort, LbService, LbServicesConfig, LbTenant};

/// Synthesizes the load-balancer routing table across all tenants.
#[derive(Debug, Clone, Default)]
pub struct LbServicesBuilder {
    zone: Zone,
}

impl LbServicesBuilder {
    /// Creates a builder keying applications by `zone`.
    #[must_use]
    pub const fn new(zone: Zone) -> Self {
        Self { zone }
    }

    /// Builds the routing table. A pure function of `snapshot`.
    #[must_use]
    pub fn build(&self, snapshot: &RegistrySnapshot) -> LbServicesConfig {
        let mut config = LbServicesConfig::default();

        for (tenant, info) in snapshot.all_applications() {
            let hosts = info
                .model()
                .hosts()
                .iter()
                .map(|host| (host.hostname.clone(), build_host(host)))
                .collect();

            config
                .tenants
                .entry(tenant.to_string())
                .or_insert_with(LbTenant::default)
                .applications
                .insert(
                    self.zone.application_key(info.id()),
                    LbApplication {
                        generation: info.generation(),
                        hosts,
                    },
                );
        }

        debug!(
            tenants = config.tenants.len(),
            applications = config.application_count(),
            generation = snapshot.generation(),
            "Built lb-services view"
        );
        config
    }
}

/// Indexes services per type in declaration order: the first service of a
/// type gets 0, the next one 1, and so on.
fn build_host(host: &HostInfo) -> LbHost {
    let mut next_index: HashMap<&str, u32> = HashMap::new();

    let services = host
        .services
        .iter()
        .map(|service| {
            let counter = next_index.entry(service.service_type.as_str()).or_insert(0);
            let index = *counter;
            *counter += 1;

            let ports = service
                .ports
                .iter()
                .map(|p| LbPort {
                    number: p.number,
                    tags: p.tags.clone(),
                })
                .collect();

            (
                service.name.clone(),
                LbService {
                    service_type: service.service_type.clone(),
                    index,
                    config_id: service.config_id.clone(),
                    ports,
                },
            )
        })
        .collect();

    LbHost {
        hostname: host.hostname.clone(),
        services,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ApplicationId, ApplicationInfo, ApplicationName, InstanceName, PortInfo, ServiceInfo,
        StaticApplicationModel, TenantName,
    };
    use crate::registry::SuperModel;
    use std::sync::Arc;

    fn port(number: u16, tag: &str) -> PortInfo {
        PortInfo {
            number,
            tags: vec![tag.to_string()],
        }
    }

    fn qrserver(config_id: &str) -> ServiceInfo {
        ServiceInfo {
            name: String::from("qrserver"),
            service_type: String::from("qrserver"),
            config_id: config_id.to_string(),
            ports: vec![
                port(4080, "http"),
                port(4081, "rpc"),
                port(4082, "admin"),
                port(4083, "fs4"),
            ],
        }
    }

    fn service(name: &str, service_type: &str) -> ServiceInfo {
        ServiceInfo {
            name: name.to_string(),
            service_type: service_type.to_string(),
            config_id: format!("search/{name}"),
            ports: vec![port(19100, "rpc")],
        }
    }

    fn deploy(registry: &SuperModel, tenant: &str, application: &str, hosts: Vec<HostInfo>) {
        let tenant = TenantName::new(tenant).unwrap();
        let id = ApplicationId::new(
            tenant.clone(),
            ApplicationName::new(application).unwrap(),
            InstanceName::default_name(),
        );
        let model = StaticApplicationModel::new(hosts).unwrap();
        registry
            .put(&tenant, ApplicationInfo::new(id, 4, Arc::new(model)))
            .unwrap();
    }

    fn simple_app() -> Vec<HostInfo> {
        vec![HostInfo {
            hostname: String::from("foo1.example.com"),
            services: vec![
                qrserver("container/qrserver.0"),
                service("logd", "logd"),
            ],
        }]
    }

    fn advanced_app() -> Vec<HostInfo> {
        vec![HostInfo {
            hostname: String::from("adv1.example.com"),
            services: vec![
                qrserver("advanced/container.0"),
                service("searchnode", "searchnode"),
                service("searchnode2", "searchnode"),
            ],
        }]
    }

    #[test]
    fn test_empty_registry() {
        let registry = SuperModel::new();
        let config = LbServicesBuilder::default().build(&registry.snapshot());
        assert!(config.tenants.is_empty());
        assert_eq!(config.application_count(), 0);
    }

    #[test]
    fn test_lb_config_simple() {
        let registry = SuperModel::new();
        deploy(&registry, "a", "foo", simple_app());

        let config = LbServicesBuilder::default().build(&registry.snapshot());
        assert_eq!(config.tenants.len(), 1);

        let tenant = config.tenant("a").unwrap();
        assert_eq!(tenant.applications.len(), 1);

        let app = tenant.application("foo:prod:default:default").unwrap();
        assert!(!app.hosts.is_empty());

        let host = app.hosts.values().next().unwrap();
        assert_eq!(host.hostname, "foo1.example.com");
        let qrs = &host.services["qrserver"];
        assert_eq!(qrs.service_type, "qrserver");
        assert_eq!(qrs.index, 0);
        assert_eq!(qrs.ports.len(), 4);
    }

    #[test]
    fn test_lb_config_multiple_apps() {
        let registry = SuperModel::new();
        deploy(&registry, "t1", "mysimpleapp", simple_app());
        deploy(&registry, "t1", "myadvancedapp", advanced_app());
        deploy(&registry, "t2", "minetooadvancedapp", advanced_app());

        let config = LbServicesBuilder::default().build(&registry.snapshot());
        assert_eq!(config.tenants.len(), 2);
        assert_eq!(config.tenant("t1").unwrap().applications.len(), 2);
        assert_eq!(config.tenant("t2").unwrap().applications.len(), 1);

        let app = config
            .tenant("t2")
            .unwrap()
            .application("minetooadvancedapp:prod:default:default")
            .unwrap();
        assert_eq!(app.hosts.len(), 1);

        let host = app.hosts.values().next().unwrap();
        let qrs = &host.services["qrserver"];
        assert_eq!(qrs.index, 0);
        assert_eq!(qrs.ports.len(), 4);
    }

    #[test]
    fn test_same_type_services_indexed_in_order() {
        let registry = SuperModel::new();
        deploy(&registry, "t1", "myadvancedapp", advanced_app());

        let config = LbServicesBuilder::default().build(&registry.snapshot());
        let app = config
            .tenant("t1")
            .unwrap()
            .application("myadvancedapp:prod:default:default")
            .unwrap();
        let host = &app.hosts["adv1.example.com"];

        assert_eq!(host.services["qrserver"].index, 0);
        assert_eq!(host.services["searchnode"].index, 0);
        assert_eq!(host.services["searchnode2"].index, 1);
    }

    #[test]
    fn test_zone_qualifies_application_key() {
        let registry = SuperModel::new();
        deploy(&registry, "a", "foo", simple_app());

        let zone = Zone {
            environment: String::from("dev"),
            region: String::from("us-east-1"),
        };
        let config = LbServicesBuilder::new(zone).build(&registry.snapshot());
        assert!(config
            .tenant("a")
            .unwrap()
            .application("foo:dev:us-east-1:default")
            .is_some());
    }

    #[test]
    fn test_build_is_deterministic() {
        let registry = SuperModel::new();
        deploy(&registry, "t1", "mysimpleapp", simple_app());
        deploy(&registry, "t2", "minetooadvancedapp", advanced_app());

        let builder = LbServicesBuilder::default();
        let first = serde_json::to_vec(&builder.build(&registry.snapshot())).unwrap();
        let second = serde_json::to_vec(&builder.build(&registry.snapshot())).unwrap();
        assert_eq!(first, second);
    }
}
