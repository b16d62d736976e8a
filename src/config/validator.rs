//! Validation for server configuration and deployment manifests.
//!
//! Collects every problem found instead of stopping at the first one, so a
//! single `validate` run reports everything an operator must fix.

use crate::catalog::{ConfigDefinitionCatalog, ConfigDefinitionKey};
use crate::encoder::CompressionType;
use crate::error::{ConfigError, Result, SuperModelError};
use crate::model::{DeploymentManifest, DeploymentSpec, HostInfo};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{EncoderConfig, LongPollConfig, ServerConfig};

/// Highest quality level brotli accepts.
const MAX_BROTLI_QUALITY: u32 = 11;

/// Validator for server configuration and deployment manifests.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a server configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &ServerConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_zone(config, &mut result);
        Self::validate_long_poll(&config.long_poll, &mut result);
        Self::validate_encoder(&config.encoder, &mut result);

        if let Some(path) = &config.deployments {
            if !path.exists() {
                result.warnings.push(format!(
                    "deployments: Manifest '{}' does not exist, registry will start empty",
                    path.display()
                ));
            }
        }

        finish(result)
    }

    /// Validates a deployment manifest against the schemas in `catalog`.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate_manifest(
        &self,
        manifest: &DeploymentManifest,
        catalog: &ConfigDefinitionCatalog,
    ) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if manifest.deployments.is_empty() {
            result.warnings.push(String::from("No deployments defined in manifest"));
        }

        for (i, deployment) in manifest.deployments.iter().enumerate() {
            let prefix = format!("deployments[{i}]");
            Self::validate_hosts(&deployment.hosts, &prefix, &mut result);
            Self::validate_configs(deployment, catalog, &prefix, &mut result);
        }

        finish(result)
    }

    fn validate_zone(config: &ServerConfig, result: &mut ValidationResult) {
        for (field, value) in [
            ("zone.environment", &config.zone.environment),
            ("zone.region", &config.zone.region),
        ] {
            if value.is_empty() {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: String::from("Cannot be empty"),
                });
            } else if !is_valid_zone_part(value) {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!(
                        "'{value}' is invalid. Must be lowercase alphanumeric with hyphens."
                    ),
                });
            }
        }
    }

    fn validate_long_poll(long_poll: &LongPollConfig, result: &mut ValidationResult) {
        if long_poll.max_timeout_ms == 0 {
            result.warnings.push(String::from(
                "long_poll.max_timeout_ms: 0 disables long polling, every request answers at once",
            ));
        }

        if long_poll.default_timeout_ms > long_poll.max_timeout_ms {
            result.errors.push(ValidationError {
                field: String::from("long_poll.default_timeout_ms"),
                message: format!(
                    "Default timeout {}ms exceeds maximum {}ms",
                    long_poll.default_timeout_ms, long_poll.max_timeout_ms
                ),
            });
        }
    }

    fn validate_encoder(encoder: &EncoderConfig, result: &mut ValidationResult) {
        if encoder.brotli_quality > MAX_BROTLI_QUALITY {
            result.errors.push(ValidationError {
                field: String::from("encoder.brotli_quality"),
                message: format!(
                    "Quality {} is out of range 0..={MAX_BROTLI_QUALITY}",
                    encoder.brotli_quality
                ),
            });
        }

        let mut seen = HashSet::new();
        for compression in &encoder.compression {
            if !seen.insert(compression) {
                result.warnings.push(format!(
                    "encoder.compression: '{compression}' is listed more than once"
                ));
            }
        }

        if !encoder.compression.contains(&CompressionType::Brotli) {
            result.warnings.push(String::from(
                "encoder.compression: Brotli disabled, all payloads are sent uncompressed",
            ));
        }

        if encoder.cache_capacity == 0 {
            result.warnings.push(String::from(
                "encoder.cache_capacity: 0 disables the payload cache",
            ));
        }
    }

    fn validate_hosts(hosts: &[HostInfo], prefix: &str, result: &mut ValidationResult) {
        if hosts.is_empty() {
            result
                .warnings
                .push(format!("{prefix}.hosts: Application has no hosts"));
        }

        for (h, host) in hosts.iter().enumerate() {
            let host_prefix = format!("{prefix}.hosts[{h}]");
            if host.hostname.is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{host_prefix}.hostname"),
                    message: String::from("Hostname cannot be empty"),
                });
            }

            let mut host_ports = HashSet::new();
            for (s, service) in host.services.iter().enumerate() {
                let service_prefix = format!("{host_prefix}.services[{s}]");

                if service.config_id.is_empty() {
                    result.errors.push(ValidationError {
                        field: format!("{service_prefix}.config_id"),
                        message: format!("Service '{}' has no config id", service.name),
                    });
                }

                for (p, port) in service.ports.iter().enumerate() {
                    if port.number == 0 {
                        result.errors.push(ValidationError {
                            field: format!("{service_prefix}.ports[{p}]"),
                            message: String::from("Port number cannot be 0"),
                        });
                    } else if !host_ports.insert(port.number) {
                        result.errors.push(ValidationError {
                            field: format!("{service_prefix}.ports[{p}]"),
                            message: format!(
                                "Port {} is used twice on {}",
                                port.number, host.hostname
                            ),
                        });
                    }
                }
            }
        }
    }

    fn validate_configs(
        deployment: &DeploymentSpec,
        catalog: &ConfigDefinitionCatalog,
        prefix: &str,
        result: &mut ValidationResult,
    ) {
        let service_ids: HashSet<&str> = deployment
            .hosts
            .iter()
            .flat_map(|h| h.services.iter().map(|s| s.config_id.as_str()))
            .collect();

        for (i, entry) in deployment.configs.iter().enumerate() {
            let field = format!("{prefix}.configs[{i}]");
            let key = ConfigDefinitionKey::new(entry.name.clone(), entry.namespace.clone());

            match catalog.lookup(&key) {
                Ok(schema) => {
                    if let Err(e) = schema.encode(&entry.payload) {
                        result.errors.push(ValidationError {
                            field: format!("{field}.payload"),
                            message: e.to_string(),
                        });
                    }
                }
                Err(e) => result.errors.push(ValidationError {
                    field: field.clone(),
                    message: e.to_string(),
                }),
            }

            if !service_ids.contains(entry.config_id.as_str()) {
                result.warnings.push(format!(
                    "{field}.config_id: '{}' is not the config id of any service in {}",
                    entry.config_id,
                    deployment.application_id()
                ));
            }
        }
    }
}

fn finish(result: ValidationResult) -> Result<ValidationResult> {
    match result.errors.first() {
        None => {
            debug!(warnings = result.warnings.len(), "Validation passed");
            Ok(result)
        }
        Some(first) => Err(SuperModelError::Config(ConfigError::ValidationError {
            message: first.message.clone(),
            field: Some(first.field.clone()),
        })),
    }
}

/// Zone parts are lowercase alphanumeric with inner hyphens.
fn is_valid_zone_part(value: &str) -> bool {
    !value.starts_with('-')
        && !value.ends_with('-')
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
