//! Deployment manifests.
//!
//! A manifest is a YAML description of deployed applications: per application
//! its tenant, name, instance, deploy generation, hosts with their services
//! and ports, and optional explicit payloads. It feeds the registry in place of
//! the application package model builder.
//!
//! ```yaml
//! deployments:
//!   - tenant: a
//!     application: foo
//!     generation: 4
//!     hosts:
//!       - hostname: foo1.example.com
//!         services:
//!           - name: qrserver
//!             type: qrserver
//!             config_id: foo/container.0
//!             ports:
//!               - { number: 4080, tags: [http] }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::ConfigDefinitionKey;
use crate::error::{ConfigError, Result, SuperModelError};
use crate::registry::SuperModel;

use super::application::{ApplicationInfo, HostInfo, StaticApplicationModel};
use super::ids::{ApplicationId, ApplicationName, InstanceName, TenantName};

/// Root of a deployment manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentManifest {
    /// Deployed applications.
    #[serde(default)]
    pub deployments: Vec<DeploymentSpec>,
}

/// One deployed application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSpec {
    /// Owning tenant.
    #[serde(default = "TenantName::default_name")]
    pub tenant: TenantName,
    /// Application name.
    pub application: ApplicationName,
    /// Instance name.
    #[serde(default = "InstanceName::default_name")]
    pub instance: InstanceName,
    /// Deploy generation.
    #[serde(default = "default_generation")]
    pub generation: u64,
    /// Hosts the application runs on.
    #[serde(default)]
    pub hosts: Vec<HostInfo>,
    /// Explicit payloads.
    #[serde(default)]
    pub configs: Vec<ConfigEntry>,
}

/// An explicit payload for one config id and schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Config id the payload answers.
    pub config_id: String,
    /// Schema name.
    pub name: String,
    /// Schema namespace.
    pub namespace: String,
    /// Payload value.
    pub payload: Value,
}

const fn default_generation() -> u64 {
    1
}

impl DeploymentSpec {
    /// Returns the application id of this deployment.
    #[must_use]
    pub fn application_id(&self) -> ApplicationId {
        ApplicationId::new(
            self.tenant.clone(),
            self.application.clone(),
            self.instance.clone(),
        )
    }

    /// Builds the registry entry for this deployment.
    ///
    /// # Errors
    ///
    /// Returns an error if hosts or services are duplicated.
    pub fn to_application_info(&self) -> std::result::Result<ApplicationInfo, ConfigError> {
        let model = self.configs.iter().fold(
            StaticApplicationModel::new(self.hosts.clone())?,
            |model, entry| {
                model.with_config(
                    entry.config_id.clone(),
                    ConfigDefinitionKey::new(entry.name.clone(), entry.namespace.clone()),
                    entry.payload.clone(),
                )
            },
        );

        Ok(ApplicationInfo::new(
            self.application_id(),
            self.generation,
            Arc::new(model),
        ))
    }
}

impl DeploymentManifest {
    /// Loads a manifest from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading deployment manifest from: {}", path.display());

        if !path.exists() {
            return Err(SuperModelError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            SuperModelError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        Self::parse_yaml(&content, Some(path))
    }

    /// Parses a manifest from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or an application is listed twice.
    pub fn parse_yaml(content: &str, source: Option<&Path>) -> Result<Self> {
        let manifest: Self = serde_yaml::from_str(content).map_err(|e| {
            SuperModelError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location: source.map(|p| p.display().to_string()),
            })
        })?;

        let mut seen = HashSet::new();
        for deployment in &manifest.deployments {
            let id = deployment.application_id();
            if !seen.insert(id.clone()) {
                return Err(SuperModelError::Config(ConfigError::DuplicateName {
                    resource_type: String::from("application"),
                    name: id.serialized_form(),
                }));
            }
        }

        debug!("Parsed manifest with {} deployments", manifest.deployments.len());
        Ok(manifest)
    }

    /// Deploys every application of the manifest into the registry.
    ///
    /// Returns the number of applications deployed.
    ///
    /// # Errors
    ///
    /// Returns an error on the first application that cannot be built or
    /// registered; earlier applications stay deployed.
    pub fn deploy_into(&self, super_model: &SuperModel) -> Result<usize> {
        for deployment in &self.deployments {
            let info = deployment.to_application_info()?;
            super_model.put(&deployment.tenant, info)?;
        }
        Ok(self.deployments.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ApplicationModel;

    const MANIFEST: &str = r"
deployments:
  - tenant: a
    application: foo
    generation: 4
    hosts:
      - hostname: foo1.example.com
        services:
          - name: qrserver
            type: qrserver
            config_id: foo/container.0
            ports:
              - { number: 4080, tags: [http] }
              - { number: 4081 }
    configs:
      - config_id: foo/container.0
        name: qr-searchers
        namespace: container
        payload:
          tag: { bold: { open: '<b>' } }
";

    #[test]
    fn test_parse_manifest() {
        let manifest = DeploymentManifest::parse_yaml(MANIFEST, None).unwrap();
        assert_eq!(manifest.deployments.len(), 1);

        let deployment = &manifest.deployments[0];
        assert_eq!(deployment.instance.as_str(), "default");
        assert_eq!(deployment.generation, 4);
        assert_eq!(deployment.hosts[0].services[0].ports.len(), 2);

        let info = deployment.to_application_info().unwrap();
        assert_eq!(info.id().serialized_form(), "a:foo:default");
        assert_eq!(info.model().config_ids(), vec!["foo/container.0".to_string()]);
    }

    #[test]
    fn test_duplicate_application_rejected() {
        let yaml = r"
deployments:
  - { tenant: t1, application: app }
  - { tenant: t1, application: app }
";
        let result = DeploymentManifest::parse_yaml(yaml, None);
        assert!(matches!(
            result,
            Err(SuperModelError::Config(ConfigError::DuplicateName { .. }))
        ));
    }

    #[test]
    fn test_deploy_into_registry() {
        let manifest = DeploymentManifest::parse_yaml(MANIFEST, None).unwrap();
        let super_model = SuperModel::new();

        assert_eq!(manifest.deploy_into(&super_model).unwrap(), 1);
        assert_eq!(super_model.generation(), 1);
        assert_eq!(super_model.stats().applications, 1);
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments.yaml");
        std::fs::write(&path, MANIFEST).unwrap();

        let manifest = DeploymentManifest::load_file(&path).unwrap();
        assert_eq!(manifest.deployments.len(), 1);

        let missing = DeploymentManifest::load_file(dir.path().join("nope.yaml"));
        assert!(matches!(
            missing,
            Err(SuperModelError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
