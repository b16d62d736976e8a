//! Load-balancer services aggregation module.
//!
//! This module synthesizes the `cloud.config.lb-services` view by walking
//! every application of every tenant in a registry snapshot:
//! - The typed routing table (tenants → applications → hosts → services)
//! - The builder re-shaping application models into that table
//! - The schema serving it through the catalog

mod builder;
mod schema;
mod types;

pub use builder::LbServicesBuilder;
pub use schema::LbServicesSchema;
pub use types::{LbApplication, LbHost, LbPort, LbService, LbServicesConfig, LbTenant};

/// Schema name of the aggregated view.
pub const LB_SERVICES_NAME: &str = "lb-services";

/// Schema namespace of the aggregated view.
pub const LB_SERVICES_NAMESPACE: &str = "cloud.config";
