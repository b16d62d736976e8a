//! Application model module.
//!
//! This module holds what the config server knows about a deployment:
//! - Validated tenant, application and instance identifiers
//! - The application model capability and its static implementation
//! - Deployment manifests that populate the registry

mod application;
mod ids;
mod manifest;

pub use application::{
    ApplicationInfo, ApplicationModel, HostInfo, PortInfo, ServiceInfo, StaticApplicationModel,
};
pub use ids::{ApplicationId, ApplicationName, DEFAULT_NAME, InstanceName, TenantName, Zone};
pub use manifest::{ConfigEntry, DeploymentManifest, DeploymentSpec};
