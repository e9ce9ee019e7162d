//! Cheap checks run before an image is decoded.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Known raster signatures: (offset, magic bytes).
const SIGNATURES: &[(usize, &[u8])] = &[
    (0, &[0xFF, 0xD8, 0xFF]),             // JPEG
    (0, &[0x89, b'P', b'N', b'G']),       // PNG
    (0, b"GIF8"),                         // GIF
    (0, b"BM"),                           // BMP
    (0, &[b'I', b'I', 0x2A, 0x00]),       // TIFF, little-endian
    (0, &[b'M', b'M', 0x00, 0x2A]),       // TIFF, big-endian
    (8, b"WEBP"),                         // WebP (RIFF container)
];

/// Validates files before decoding.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Perform quick validation before full decode.
    ///
    /// Checks:
    /// - File exists and is readable
    /// - File size is within limits
    /// - File starts with a known raster signature
    pub fn validate(&self, path: &Path) -> Result<(), PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read metadata: {}", e),
        })?;

        let max_bytes = self.limits.max_file_size_mb.saturating_mul(1024 * 1024);
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        let mut header = [0u8; 12];
        let bytes_read = std::fs::File::open(path)
            .and_then(|mut file| file.read(&mut header))
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot open file: {}", e),
            })?;

        if !Self::has_known_signature(&header[..bytes_read]) {
            return Err(PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Check if the header bytes match a format the loader can decode.
    fn has_known_signature(header: &[u8]) -> bool {
        if header.starts_with(b"RIFF") && header.len() < 12 {
            // Truncated RIFF header: let the decoder decide.
            return true;
        }
        SIGNATURES.iter().any(|(offset, magic)| {
            header
                .get(*offset..*offset + magic.len())
                .is_some_and(|bytes| bytes == *magic)
        })
    }
}
