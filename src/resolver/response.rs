//! Resolution outcomes.

use std::sync::Arc;

use crate::encoder::{CompressionType, EncodedPayload};

use super::request::Trace;

/// A fresh payload for the caller.
#[derive(Debug, Clone)]
pub struct ResolvedPayload {
    /// Checksum of the uncompressed canonical payload.
    pub checksum: String,
    /// Registry generation the payload was resolved at.
    pub generation: u64,
    /// Encoded payload bytes.
    pub payload: Arc<EncodedPayload>,
    /// Trace output, empty unless requested.
    pub trace: Trace,
}

impl ResolvedPayload {
    /// Compression actually applied.
    #[must_use]
    pub fn compression(&self) -> CompressionType {
        self.payload.compression
    }
}

/// Result of a successful resolution.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The payload differs from what the caller holds.
    Fresh(ResolvedPayload),
    /// Nothing changed before the long-poll timeout elapsed.
    Unchanged {
        /// Checksum the caller already holds.
        checksum: String,
        /// Registry generation at the time of the answer.
        generation: u64,
        /// Trace output, empty unless requested.
        trace: Trace,
    },
}

impl Resolution {
    /// Returns the payload checksum carried by this outcome.
    #[must_use]
    pub fn checksum(&self) -> &str {
        match self {
            Self::Fresh(payload) => &payload.checksum,
            Self::Unchanged { checksum, .. } => checksum,
        }
    }

    /// Returns the registry generation carried by this outcome.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        match self {
            Self::Fresh(payload) => payload.generation,
            Self::Unchanged { generation, .. } => *generation,
        }
    }

    /// Returns true if the caller's payload is still current.
    #[must_use]
    pub const fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged { .. })
    }

    /// Returns the fresh payload, if any.
    #[must_use]
    pub const fn fresh(&self) -> Option<&ResolvedPayload> {
        match self {
            Self::Fresh(payload) => Some(payload),
            Self::Unchanged { .. } => None,
        }
    }

    /// Returns the trace output.
    #[must_use]
    pub const fn trace(&self) -> &Trace {
        match self {
            Self::Fresh(payload) => &payload.trace,
            Self::Unchanged { trace, .. } => trace,
        }
    }
}
