//! Sub-configuration structs with their defaults.

use crate::decoder::Symbology;
use crate::preprocess::PreprocessStep;
use crate::sweep::SweepParams;
use serde::{Deserialize, Serialize};

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of images scanned concurrently
    pub parallel_workers: usize,

    /// File extensions picked up by discovery
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: 4,
            supported_formats: vec!["jpg".to_string(), "jpeg".to_string()],
        }
    }
}

/// Rotation sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Degrees between consecutive attempts
    pub angle_step: u32,

    /// Exclusive upper bound of the swept angles
    pub max_angle: u32,

    /// Median filter kernel size (odd)
    pub filter_kernel_size: u32,

    /// Steps applied once to each image before the sweep starts
    pub preprocess: Vec<PreprocessStep>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let params = SweepParams::default();
        Self {
            angle_step: params.angle_step,
            max_angle: params.max_angle,
            filter_kernel_size: params.filter_kernel_size,
            preprocess: Vec::new(),
        }
    }
}

impl SweepConfig {
    /// The sweep parameters described by this section.
    pub fn params(&self) -> SweepParams {
        SweepParams {
            angle_step: self.angle_step,
            max_angle: self.max_angle,
            filter_kernel_size: self.filter_kernel_size,
        }
    }
}

/// Barcode decoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Backend name ("rxing")
    pub backend: String,

    /// Symbologies to accept. Empty accepts every symbology the backend reads.
    pub formats: Vec<Symbology>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            backend: "rxing".to_string(),
            formats: Vec::new(),
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
