//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::catalog::ConfigDefinitionCatalog;
use crate::config::ValidationResult;
use crate::encoder::PayloadHasher;
use crate::lbservices::LbServicesConfig;
use crate::registry::StatusReport;
use crate::resolver::Resolution;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Service row of the `lb-services` table.
#[derive(Tabled)]
struct ServiceRow {
    #[tabled(rename = "Tenant")]
    tenant: String,
    #[tabled(rename = "Application")]
    application: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Index")]
    index: u32,
    #[tabled(rename = "Ports")]
    ports: String,
}

/// Schema row of the catalog table.
#[derive(Tabled)]
struct SchemaRow {
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Definition checksum")]
    checksum: String,
}

/// Tenant row of the status table.
#[derive(Tabled)]
struct TenantRow {
    #[tabled(rename = "Tenant")]
    tenant: String,
    #[tabled(rename = "Applications")]
    applications: usize,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a registry status report.
    #[must_use]
    pub fn format_status(&self, report: &StatusReport) -> String {
        match self.format {
            OutputFormat::Json => report.to_json().unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(
                    output,
                    "\nRegistry at generation {}",
                    report.stats.generation.to_string().bold()
                );
                let _ = writeln!(
                    output,
                    "   {} tenants, {} applications\n",
                    report.stats.tenants, report.stats.applications
                );

                if report.applications_per_tenant.is_empty() {
                    output.push_str("   No applications deployed.\n");
                    return output;
                }

                let rows: Vec<TenantRow> = report
                    .applications_per_tenant
                    .iter()
                    .map(|(tenant, applications)| TenantRow {
                        tenant: tenant.clone(),
                        applications: *applications,
                    })
                    .collect();
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats the load-balancer routing table.
    #[must_use]
    pub fn format_lb_services(&self, config: &LbServicesConfig) -> String {
        match self.format {
            OutputFormat::Json => to_pretty_json(config),
            OutputFormat::Text => {
                let rows: Vec<ServiceRow> = config
                    .tenants
                    .iter()
                    .flat_map(|(tenant, t)| {
                        t.applications.iter().flat_map(move |(application, app)| {
                            app.hosts.values().flat_map(move |host| {
                                host.services.iter().map(move |(name, service)| ServiceRow {
                                    tenant: tenant.clone(),
                                    application: application.clone(),
                                    host: host.hostname.clone(),
                                    service: format!("{name} ({})", service.service_type),
                                    index: service.index,
                                    ports: service
                                        .ports
                                        .iter()
                                        .map(|p| p.number.to_string())
                                        .collect::<Vec<_>>()
                                        .join(","),
                                })
                            })
                        })
                    })
                    .collect();

                if rows.is_empty() {
                    return String::from("No services deployed.\n");
                }

                let mut output = Table::new(rows).to_string();
                let _ = write!(
                    output,
                    "\n\n{} applications across {} tenants\n",
                    config.application_count(),
                    config.tenants.len()
                );
                output
            }
        }
    }

    /// Formats a resolution outcome with its decoded payload, if fresh.
    #[must_use]
    pub fn format_resolution(&self, resolution: &Resolution, payload: Option<&Value>) -> String {
        match self.format {
            OutputFormat::Json => to_pretty_json(&ResolutionJson::new(resolution, payload)),
            OutputFormat::Text => {
                let mut output = String::new();

                match resolution {
                    Resolution::Fresh(fresh) => {
                        let _ = writeln!(
                            output,
                            "{} Fresh payload {} at generation {}",
                            "✓".green(),
                            PayloadHasher::short_hash(&fresh.checksum).bold(),
                            fresh.generation
                        );
                        let _ = writeln!(
                            output,
                            "   {} bytes {} ({} uncompressed)",
                            fresh.payload.bytes.len(),
                            fresh.compression(),
                            fresh.payload.uncompressed_size
                        );
                        if let Some(payload) = payload {
                            let _ = writeln!(output, "\n{}", to_pretty_json(payload));
                        }
                    }
                    Resolution::Unchanged {
                        checksum,
                        generation,
                        ..
                    } => {
                        let _ = writeln!(
                            output,
                            "{} Unchanged {} at generation {generation}",
                            "=".dimmed(),
                            PayloadHasher::short_hash(checksum)
                        );
                    }
                }

                let trace = resolution.trace().entries();
                if !trace.is_empty() {
                    output.push_str("\nTrace:\n");
                    for entry in trace {
                        let _ = writeln!(output, "   - {entry}");
                    }
                }

                output
            }
        }
    }

    /// Formats the definition catalog.
    #[must_use]
    pub fn format_catalog(&self, catalog: &ConfigDefinitionCatalog) -> String {
        let rows: Vec<SchemaRow> = catalog
            .keys()
            .into_iter()
            .filter_map(|key| catalog.lookup(&key).ok())
            .map(|schema| SchemaRow {
                namespace: schema.key().namespace.clone(),
                name: schema.key().name.clone(),
                checksum: schema.definition_checksum().to_string(),
            })
            .collect();

        match self.format {
            OutputFormat::Json => {
                let json: Vec<Value> = rows
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "namespace": r.namespace,
                            "name": r.name,
                            "definitionChecksum": r.checksum,
                        })
                    })
                    .collect();
                to_pretty_json(&json)
            }
            OutputFormat::Text => {
                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(
        &self,
        subject: &str,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => to_pretty_json(&serde_json::json!({
                "subject": subject,
                "valid": result.is_valid(),
                "warnings": result.warnings,
            })),
            OutputFormat::Text => {
                let mut output = format!("{} {subject} is valid\n", "✓".green());
                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                } else if result.warning_count() > 0 {
                    let _ = writeln!(
                        output,
                        "   {} warnings (use --warnings to show)",
                        result.warning_count()
                    );
                }
                output
            }
        }
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                to_pretty_json(&serde_json::json!({ "status": "error", "message": message }))
            }
            OutputFormat::Text => format!("{} {message}", "✗".red()),
        }
    }
}

fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

// JSON serialization helpers

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolutionJson<'a> {
    status: &'static str,
    checksum: &'a str,
    generation: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    compression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a Value>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    trace: &'a [String],
}

impl<'a> ResolutionJson<'a> {
    fn new(resolution: &'a Resolution, payload: Option<&'a Value>) -> Self {
        Self {
            status: if resolution.is_unchanged() { "unchanged" } else { "fresh" },
            checksum: resolution.checksum(),
            generation: resolution.generation(),
            compression: resolution.fresh().map(|f| f.compression().to_string()),
            payload,
            trace: resolution.trace().entries(),
        }
    }
}
