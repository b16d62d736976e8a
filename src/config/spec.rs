//! Server configuration types.
//!
//! This module defines the structs that map to `supermodel.yaml`. Every
//! section is optional; an empty file yields a working server.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::encoder::CompressionType;
use crate::model::Zone;

/// The root server configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Zone this server runs in; qualifies application keys in `lb-services`.
    pub zone: Zone,
    /// Long-poll limits.
    pub long_poll: LongPollConfig,
    /// Response encoding.
    pub encoder: EncoderConfig,
    /// Deployment manifest loaded into the registry at startup.
    pub deployments: Option<PathBuf>,
}

/// Long-poll limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongPollConfig {
    /// Timeout applied when a caller does not ask for one, in milliseconds.
    pub default_timeout_ms: u64,
    /// Upper bound on any caller's timeout, in milliseconds.
    pub max_timeout_ms: u64,
}

impl LongPollConfig {
    /// Returns the default timeout.
    #[must_use]
    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Returns the maximum timeout.
    #[must_use]
    pub const fn max_timeout(&self) -> Duration {
        Duration::from_millis(self.max_timeout_ms)
    }
}

impl Default for LongPollConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 25_000,
            max_timeout_ms: 60_000,
        }
    }
}

/// Response encoding settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Compression types offered to callers. Uncompressed is always offered.
    pub compression: Vec<CompressionType>,
    /// Brotli quality, 0 to 11.
    pub brotli_quality: u32,
    /// Encoded payloads kept in memory; 0 disables the cache.
    pub cache_capacity: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            compression: vec![CompressionType::Uncompressed, CompressionType::Brotli],
            brotli_quality: 5,
            cache_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.zone.environment, "prod");
        assert_eq!(config.long_poll.max_timeout(), Duration::from_secs(60));
        assert!(config.encoder.compression.contains(&CompressionType::Brotli));
        assert!(config.deployments.is_none());
    }
}
