//! Read-only registry counters for operational reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::snapshot::RegistrySnapshot;

/// Counters describing the registry at one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Number of tenants.
    pub tenants: usize,
    /// Number of applications.
    pub applications: usize,
    /// Registry generation.
    pub generation: u64,
}

impl RegistryStats {
    /// Computes the counters of a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &RegistrySnapshot) -> Self {
        Self {
            tenants: snapshot.tenant_count(),
            applications: snapshot.application_count(),
            generation: snapshot.generation(),
        }
    }
}

/// Status document handed to the reporting collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Aggregate counters.
    #[serde(flatten)]
    pub stats: RegistryStats,
    /// Application count per tenant.
    pub applications_per_tenant: BTreeMap<String, usize>,
    /// When the report was rendered.
    pub rendered_at: DateTime<Utc>,
}

impl StatusReport {
    /// Builds a report from a snapshot.
    #[must_use]
    pub fn from_snapshot(snapshot: &RegistrySnapshot) -> Self {
        let applications_per_tenant = snapshot
            .tenants()
            .map(|tenant| (tenant.to_string(), snapshot.applications_of(tenant).count()))
            .collect();

        Self {
            stats: RegistryStats::from_snapshot(snapshot),
            applications_per_tenant,
            rendered_at: Utc::now(),
        }
    }

    /// Renders the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
