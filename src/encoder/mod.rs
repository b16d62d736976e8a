//! Response encoding module.
//!
//! This module turns resolved payloads into wire bytes:
//! - Checksums over the uncompressed canonical form
//! - Compression types and negotiation with fallback
//! - A bounded cache of encoded payloads

mod checksum;
mod compression;
mod response;

pub use checksum::PayloadHasher;
pub use compression::CompressionType;
pub use response::{EncodedPayload, ResponseEncoder};
