//! Error types for the supermodel config server core.
//!
//! This module provides the error hierarchy for every layer: server
//! configuration and deployment manifests, the definition catalog, the
//! registry, and config resolution. Resolution errors carry a
//! machine-readable [`ErrorKind`] so callers can tell a permanent
//! misconfiguration from a transient miss.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the supermodel crate.
#[derive(Debug, Error)]
pub enum SuperModelError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Config definition catalog errors.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Registry mutation errors.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Config resolution errors.
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Server configuration and deployment manifest errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A tenant, application or instance name is malformed.
    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        /// Which kind of name (tenant, application, ...).
        kind: &'static str,
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Duplicate resource definition.
    #[error("Duplicate {resource_type} name: {name}")]
    DuplicateName {
        /// Type of resource (application, host, service).
        resource_type: String,
        /// The duplicated name.
        name: String,
    },
}

/// Config definition catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A schema with the same name and namespace is already registered.
    #[error("Config definition already registered: {key}")]
    DuplicateDefinition {
        /// The `namespace.name` key.
        key: String,
    },
}

/// Registry mutation errors.
///
/// A failed mutation never leaves a partially visible application behind.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The application id does not belong to the tenant it was filed under.
    #[error("Application {application} cannot be registered under tenant {tenant}")]
    TenantMismatch {
        /// Tenant key passed to the mutation.
        tenant: String,
        /// Serialized application id.
        application: String,
    },

    /// A redeploy carried an older generation than the live one.
    #[error("Stale generation {offered} for {application}, current is {current}")]
    StaleGeneration {
        /// Serialized application id.
        application: String,
        /// Generation currently in the registry.
        current: u64,
        /// Generation offered by the deployer.
        offered: u64,
    },
}

/// Config resolution errors.
///
/// `Unchanged` long-poll outcomes are not errors and are reported through
/// [`crate::resolver::Resolution`] instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No schema is registered under the requested name and namespace.
    #[error("Unknown config definition: {namespace}.{name}")]
    UnknownSchema {
        /// Requested schema name.
        name: String,
        /// Requested schema namespace.
        namespace: String,
    },

    /// The caller holds a different definition of the schema than the server.
    #[error(
        "Config definition {namespace}.{name} mismatch: \
         client has {client_checksum}, server has {server_checksum}"
    )]
    SchemaMismatch {
        /// Requested schema name.
        name: String,
        /// Requested schema namespace.
        namespace: String,
        /// Definition checksum presented by the caller.
        client_checksum: String,
        /// Definition checksum known to the server.
        server_checksum: String,
    },

    /// No application in the current registry snapshot claims the config id.
    #[error("No such config id '{config_id}': {reason}")]
    NoSuchConfigId {
        /// Requested config id.
        config_id: String,
        /// Why no owner was found.
        reason: String,
    },

    /// The payload could not be serialized, compressed or decoded.
    #[error("Encoding failed: {message}")]
    Encoding {
        /// Description of the encoding failure.
        message: String,
    },

    /// The caller went away while the request was suspended.
    #[error("Request cancelled while waiting for config change")]
    Cancelled,
}

/// Machine-readable category of a [`ResolveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown schema or schema definition mismatch. Permanent until redeploy.
    UnknownSchema,
    /// No owner for the config id. Possibly transient.
    NoSuchConfigId,
    /// Serialization or compression failure, fatal to the single request.
    Encoding,
    /// The request was abandoned by its caller.
    Cancelled,
}

impl ErrorKind {
    /// Returns the wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownSchema => "unknown-schema",
            Self::NoSuchConfigId => "no-such-config-id",
            Self::Encoding => "encoding",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for supermodel operations.
pub type Result<T> = std::result::Result<T, SuperModelError>;

impl SuperModelError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is worth retrying by the caller.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Resolve(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl ResolveError {
    /// Creates a no-such-config-id error.
    #[must_use]
    pub fn no_such_config_id(config_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoSuchConfigId {
            config_id: config_id.into(),
            reason: reason.into(),
        }
    }

    /// Creates an encoding error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Returns the machine-readable kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownSchema { .. } | Self::SchemaMismatch { .. } => ErrorKind::UnknownSchema,
            Self::NoSuchConfigId { .. } => ErrorKind::NoSuchConfigId,
            Self::Encoding { .. } => ErrorKind::Encoding,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns true if the caller should retry with backoff.
    ///
    /// The server never retries internally.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::NoSuchConfigId { .. })
    }
}
