//! Inbound resolution requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::catalog::ConfigDefinitionKey;

/// Which instance of which schema is requested.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigKey {
    config_id: String,
    definition: ConfigDefinitionKey,
}

impl ConfigKey {
    /// Creates a config key.
    #[must_use]
    pub fn new(config_id: impl Into<String>, definition: ConfigDefinitionKey) -> Self {
        Self {
            config_id: config_id.into(),
            definition,
        }
    }

    /// The requesting config id.
    #[must_use]
    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    /// The requested schema.
    #[must_use]
    pub const fn definition(&self) -> &ConfigDefinitionKey {
        &self.definition
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.definition, self.config_id)
    }
}

/// One inbound resolution request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Requested config.
    pub key: ConfigKey,
    /// Checksum of the caller's schema definition; empty skips the check.
    pub definition_checksum: String,
    /// Payload checksum the caller already holds; empty if none.
    pub last_checksum: String,
    /// Registry generation the caller last saw.
    pub last_generation: u64,
    /// Requested compression name.
    pub compression: String,
    /// Trace verbosity, 0 disables tracing.
    pub trace_level: u8,
    /// Hostname the request came from.
    pub client_hostname: Option<String>,
    /// How long to hold the request when nothing changed; zero answers at once.
    pub timeout: Duration,
}

impl RequestContext {
    /// Creates a request with no prior state, no compression and no long poll.
    #[must_use]
    pub fn new(key: ConfigKey) -> Self {
        Self {
            key,
            definition_checksum: String::new(),
            last_checksum: String::new(),
            last_generation: 0,
            compression: String::new(),
            trace_level: 0,
            client_hostname: None,
            timeout: Duration::ZERO,
        }
    }

    /// Sets the checksum and generation the caller already holds.
    #[must_use]
    pub fn with_last_seen(mut self, checksum: impl Into<String>, generation: u64) -> Self {
        self.last_checksum = checksum.into();
        self.last_generation = generation;
        self
    }

    /// Sets the caller's schema definition checksum.
    #[must_use]
    pub fn with_definition_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.definition_checksum = checksum.into();
        self
    }

    /// Sets the requested compression.
    #[must_use]
    pub fn with_compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = compression.into();
        self
    }

    /// Sets the trace level.
    #[must_use]
    pub const fn with_trace_level(mut self, level: u8) -> Self {
        self.trace_level = level;
        self
    }

    /// Sets the requesting hostname.
    #[must_use]
    pub fn with_client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = Some(hostname.into());
        self
    }

    /// Sets the long-poll timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Trace messages collected while resolving, returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    level: u8,
    entries: Vec<String>,
}

impl Trace {
    /// Creates a trace at `level`.
    #[must_use]
    pub const fn new(level: u8) -> Self {
        Self {
            level,
            entries: Vec::new(),
        }
    }

    /// Records `message` if the trace level is at least `level`.
    pub fn trace(&mut self, level: u8, message: impl FnOnce() -> String) {
        if self.level >= level {
            self.entries.push(message());
        }
    }

    /// Recorded messages in order.
    #[must_use]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}
