//! Payload hashing for change detection.
//!
//! Checksums are always taken over the uncompressed canonical bytes, so two
//! callers negotiating different compression see the same checksum for the
//! same data.

use sha2::{Digest, Sha256};

/// Hasher for computing payload checksums.
#[derive(Debug, Default)]
pub struct PayloadHasher;

impl PayloadHasher {
    /// Computes the hex-encoded SHA-256 of `bytes`.
    #[must_use]
    pub fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two checksums in constant time.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}
