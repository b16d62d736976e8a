//! Response encoding with compression negotiation.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

use crate::config::EncoderConfig;
use crate::error::ResolveError;

use super::compression::CompressionType;

/// A payload ready to go on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Possibly compressed bytes.
    pub bytes: Vec<u8>,
    /// Compression actually applied.
    pub compression: CompressionType,
    /// Size of the canonical bytes before compression.
    pub uncompressed_size: usize,
}

impl EncodedPayload {
    /// Restores the canonical bytes.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if decompression fails.
    pub fn decode(&self) -> Result<Vec<u8>, ResolveError> {
        let bytes = self.compression.decompress(&self.bytes)?;
        if bytes.len() != self.uncompressed_size {
            return Err(ResolveError::encoding(format!(
                "decoded {} bytes, expected {}",
                bytes.len(),
                self.uncompressed_size
            )));
        }
        Ok(bytes)
    }
}

type CacheKey = (String, CompressionType);

/// Encodes canonical payload bytes under a negotiated compression.
///
/// Encoded payloads are cached by `(checksum, compression)` so the many
/// callers waking for the same change share one compression pass.
#[derive(Debug)]
pub struct ResponseEncoder {
    supported: Vec<CompressionType>,
    brotli_quality: u32,
    cache: Option<Mutex<LruCache<CacheKey, Arc<EncodedPayload>>>>,
}

impl ResponseEncoder {
    /// Creates an encoder from its configuration.
    #[must_use]
    pub fn new(config: &EncoderConfig) -> Self {
        let mut supported = config.compression.clone();
        if !supported.contains(&CompressionType::Uncompressed) {
            supported.push(CompressionType::Uncompressed);
        }

        Self {
            supported,
            brotli_quality: config.brotli_quality,
            cache: NonZeroUsize::new(config.cache_capacity).map(|c| Mutex::new(LruCache::new(c))),
        }
    }

    /// Picks the compression to use for a caller's requested type.
    ///
    /// Unknown or disabled types fall back to uncompressed.
    #[must_use]
    pub fn negotiate(&self, requested: &str) -> CompressionType {
        match CompressionType::from_name(requested) {
            Some(compression) if self.supported.contains(&compression) => compression,
            _ => {
                debug!(requested, "Compression not supported, sending uncompressed");
                CompressionType::Uncompressed
            }
        }
    }

    /// Encodes `canonical` bytes whose checksum is `checksum`.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if compression fails. The cache is left
    /// untouched in that case.
    pub fn encode(
        &self,
        checksum: &str,
        canonical: &[u8],
        requested: &str,
    ) -> Result<Arc<EncodedPayload>, ResolveError> {
        let compression = self.negotiate(requested);
        let key = (checksum.to_string(), compression);

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.lock().get(&key) {
                return Ok(Arc::clone(hit));
            }
        }

        let encoded = Arc::new(EncodedPayload {
            bytes: compression.compress(canonical, self.brotli_quality)?,
            compression,
            uncompressed_size: canonical.len(),
        });

        if let Some(cache) = &self.cache {
            cache.lock().put(key, Arc::clone(&encoded));
        }

        Ok(encoded)
    }

    /// Returns the number of cached encoded payloads.
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.lock().len())
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::new(&EncoderConfig::default())
    }
}
