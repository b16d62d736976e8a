//! Payload compression types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};

use crate::error::ResolveError;

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_WINDOW: u32 = 22;

/// Compression applied to an encoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    /// Canonical bytes as-is.
    #[default]
    Uncompressed,
    /// Brotli-compressed canonical bytes.
    Brotli,
}

impl CompressionType {
    /// Parses a caller-supplied compression name, case-insensitively.
    ///
    /// Returns `None` for names this server does not implement.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "uncompressed" | "none" | "" => Some(Self::Uncompressed),
            "brotli" | "br" => Some(Self::Brotli),
            _ => None,
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uncompressed => "uncompressed",
            Self::Brotli => "brotli",
        }
    }

    /// Compresses `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the compressor fails.
    pub fn compress(self, bytes: &[u8], quality: u32) -> Result<Vec<u8>, ResolveError> {
        match self {
            Self::Uncompressed => Ok(bytes.to_vec()),
            Self::Brotli => {
                let mut writer = brotli::CompressorWriter::new(
                    Vec::with_capacity(bytes.len() / 2),
                    BROTLI_BUFFER_SIZE,
                    quality,
                    BROTLI_WINDOW,
                );
                writer
                    .write_all(bytes)
                    .map_err(|e| {
                        ResolveError::encoding(format!("brotli compression failed: {e}"))
                    })?;
                Ok(writer.into_inner())
            }
        }
    }

    /// Reverses [`CompressionType::compress`].
    ///
    /// # Errors
    ///
    /// Returns an encoding error if the input is not valid compressed data.
    pub fn decompress(self, bytes: &[u8]) -> Result<Vec<u8>, ResolveError> {
        match self {
            Self::Uncompressed => Ok(bytes.to_vec()),
            Self::Brotli => {
                let mut out = Vec::new();
                brotli::Decompressor::new(bytes, BROTLI_BUFFER_SIZE)
                    .read_to_end(&mut out)
                    .map_err(|e| {
                        ResolveError::encoding(format!("brotli decompression failed: {e}"))
                    })?;
                Ok(out)
            }
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(CompressionType::from_name("BROTLI"), Some(CompressionType::Brotli));
        assert_eq!(CompressionType::from_name(""), Some(CompressionType::Uncompressed));
        assert_eq!(CompressionType::from_name("lz4"), None);
    }

    #[test]
    fn test_brotli_shrinks_repetitive_payload() {
        let payload = "qrserver ".repeat(500);
        let compressed = CompressionType::Brotli.compress(payload.as_bytes(), 5).unwrap();
        assert!(compressed.len() < payload.len());

        let restored = CompressionType::Brotli.decompress(&compressed).unwrap();
        assert_eq!(restored, payload.as_bytes());
    }

    #[test]
    fn test_truncated_stream_fails_to_decompress() {
        let payload = "searchnode ".repeat(500);
        let compressed = CompressionType::Brotli.compress(payload.as_bytes(), 5).unwrap();
        let truncated = &compressed[..compressed.len() / 2];
        assert!(CompressionType::Brotli.decompress(truncated).is_err());
    }
}
