use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::debug;

/// Compression configuration for persisted cache blobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Enable gzip compression
    pub enabled: bool,
    /// Gzip level (0-9)
    pub level: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 6, // flate2 default
        }
    }
}

/// Gzip (deflate) compressor for L2 blobs
#[derive(Debug, Clone)]
pub struct Compressor {
    config: CompressionConfig,
}

impl Compressor {
    pub fn new(config: CompressionConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// File extension for blobs produced by this compressor
    pub fn extension(&self) -> &'static str {
        if self.is_enabled() { "json.gz" } else { "json" }
    }

    /// Compress data when enabled, otherwise return it unchanged
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
        if !self.is_enabled() {
            return Ok(data.to_vec());
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.config.level.min(9)));
        encoder.write_all(data)?;
        let compressed = encoder.finish()?;

        debug!(
            "Gzip compressed: {} → {} bytes (ratio: {:.2}x)",
            data.len(),
            compressed.len(),
            compression_ratio(data.len(), compressed.len())
        );

        Ok(compressed)
    }

    /// Decompress data when enabled, otherwise return it unchanged
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, std::io::Error> {
        if !self.is_enabled() {
            return Ok(data.to_vec());
        }

        let mut decoder = GzDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Ok(decompressed)
    }
}

/// Calculate compression ratio
pub fn compression_ratio(original: usize, compressed: usize) -> f64 {
    if compressed == 0 {
        return 1.0;
    }
    original as f64 / compressed as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_compression() {
        let compressor = Compressor::new(CompressionConfig::default());

        let data = b"Hello, World! This is a test string that should compress well.".repeat(10);
        let compressed = compressor.compress(&data).unwrap();

        assert!(compressed.len() < data.len());
        // gzip magic bytes
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);

        let decompressed = compressor.decompress(&compressed).unwrap();
        assert_eq!(data.to_vec(), decompressed);
    }

    #[test]
    fn test_compression_disabled() {
        let compressor = Compressor::new(CompressionConfig {
            enabled: false,
            ..Default::default()
        });

        let data = b"Hello, World!".repeat(100);
        assert_eq!(compressor.compress(&data).unwrap(), data);
        assert_eq!(compressor.extension(), "json");
    }

    #[test]
    fn test_decompress_garbage_fails() {
        let compressor = Compressor::new(CompressionConfig::default());
        assert!(compressor.decompress(b"not gzip at all").is_err());
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(compression_ratio(1000, 500), 2.0);
        assert!((compression_ratio(1000, 333) - 3.0).abs() < 0.01);
        assert_eq!(compression_ratio(10, 0), 1.0);
    }
}
