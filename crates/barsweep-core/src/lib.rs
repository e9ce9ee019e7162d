//! Barsweep Core - rotation-sweep barcode scanning library.
//!
//! Barsweep reads barcodes that a plain decoder misses because the code is
//! printed at an angle. Each image is median filtered, then handed to a
//! decoder at a series of rotations until one of them reads.
//!
//! # Architecture
//!
//! ```text
//! Image → Validate → Load → Preprocess → Median → Rotate(0..360) → Decode → JSON
//! ```
//!
//! The decoder itself is pluggable through [`BarcodeDecoder`]; the default
//! backend is [`RxingDecoder`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use barsweep_core::{BatchSummary, Config, ImageProcessor};
//!
//! #[tokio::main]
//! async fn main() -> barsweep_core::Result<()> {
//!     let config = Config::load()?;
//!     let processor = ImageProcessor::new(&config)?;
//!
//!     let outcome = processor.process("./label.jpg".as_ref()).await;
//!     println!("{}: {:?}", outcome.status, outcome.barcode_text);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod decoder;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod sweep;
pub mod types;

// Re-exports for convenient access
pub use config::Config;
pub use decoder::{BarcodeDecoder, DecoderFactory, FnDecoder, RxingDecoder, Symbology};
pub use error::{BarsweepError, ConfigError, PipelineError, PipelineResult, Result};
pub use output::{OutputFormat, OutputWriter};
pub use pipeline::{DiscoveredFile, ImageProcessor};
pub use preprocess::PreprocessStep;
pub use sweep::{RotationSweepDecoder, SweepParams};
pub use types::{BatchSummary, DecodeAttempt, DecodeOutcome, DecodeStatus};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
