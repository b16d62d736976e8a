//! Tenant, application and instance identifiers.
//!
//! Names are validated once on construction and immutable afterwards.
//! [`ApplicationId`] is the composite key every registry entry is filed under.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

/// Maximum length of any identifier component.
const MAX_NAME_LEN: usize = 256;

/// Name used when no tenant or instance is given.
pub const DEFAULT_NAME: &str = "default";

fn validate_name(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name.len() > MAX_NAME_LEN {
        Some("longer than 256 characters")
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Some("only ASCII letters, digits, '-' and '_' are allowed")
    } else {
        None
    };

    reason.map_or(Ok(()), |reason| {
        Err(ConfigError::InvalidName {
            kind,
            name: name.to_string(),
            reason,
        })
    })
}

macro_rules! name_type {
    ($(#[$meta:meta])* $ty:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $ty(String);

        impl $ty {
            /// Creates a validated name.
            ///
            /// # Errors
            ///
            /// Returns an error if the name is empty, too long or contains
            /// characters outside `[A-Za-z0-9_-]`.
            pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
                let name = name.into();
                validate_name($kind, &name)?;
                Ok(Self(name))
            }

            /// Returns the `default` name.
            #[must_use]
            pub fn default_name() -> Self {
                Self(DEFAULT_NAME.to_string())
            }

            /// Returns the name as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $ty {
            type Error = ConfigError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> Self {
                value.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

name_type!(
    /// An isolated namespace owning zero or more applications.
    TenantName,
    "tenant"
);
name_type!(
    /// Name of a deployed application within a tenant.
    ApplicationName,
    "application"
);
name_type!(
    /// Name of one instance of an application.
    InstanceName,
    "instance"
);

/// Globally unique identity of a deployed application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApplicationId {
    tenant: TenantName,
    application: ApplicationName,
    instance: InstanceName,
}

impl ApplicationId {
    /// Creates an application id from its parts.
    #[must_use]
    pub const fn new(
        tenant: TenantName,
        application: ApplicationName,
        instance: InstanceName,
    ) -> Self {
        Self {
            tenant,
            application,
            instance,
        }
    }

    /// Parses the `tenant:application:instance` form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string does not have three valid components.
    pub fn parse(serialized: &str) -> Result<Self, ConfigError> {
        let parts: Vec<&str> = serialized.split(':').collect();
        let [tenant, application, instance] = parts.as_slice() else {
            return Err(ConfigError::InvalidName {
                kind: "application id",
                name: serialized.to_string(),
                reason: "expected tenant:application:instance",
            });
        };

        Ok(Self::new(
            TenantName::new(*tenant)?,
            ApplicationName::new(*application)?,
            InstanceName::new(*instance)?,
        ))
    }

    /// Returns the owning tenant.
    #[must_use]
    pub const fn tenant(&self) -> &TenantName {
        &self.tenant
    }

    /// Returns the application name.
    #[must_use]
    pub const fn application(&self) -> &ApplicationName {
        &self.application
    }

    /// Returns the instance name.
    #[must_use]
    pub const fn instance(&self) -> &InstanceName {
        &self.instance
    }

    /// Returns the `tenant:application:instance` form.
    #[must_use]
    pub fn serialized_form(&self) -> String {
        format!("{}:{}:{}", self.tenant, self.application, self.instance)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.tenant, self.application, self.instance)
    }
}

/// The environment and region this server runs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Zone {
    /// Environment, e.g. `prod` or `dev`.
    pub environment: String,
    /// Region within the environment.
    pub region: String,
}

impl Default for Zone {
    fn default() -> Self {
        Self {
            environment: String::from("prod"),
            region: String::from(DEFAULT_NAME),
        }
    }
}

impl Zone {
    /// Returns the zone-qualified key of an application:
    /// `application:environment:region:instance`.
    #[must_use]
    pub fn application_key(&self, id: &ApplicationId) -> String {
        format!(
            "{}:{}:{}:{}",
            id.application(),
            self.environment,
            self.region,
            id.instance()
        )
    }
}
