//! Image scanning pipeline components.
//!
//! This module contains the stages that surround the rotation sweep:
//! - **discovery**: Find image files in directories
//! - **validate**: Pre-load validation (size, magic bytes)
//! - **load**: Decode image files into rasters
//! - **processor**: Orchestrates the full pipeline per image

pub mod discovery;
pub mod load;
pub mod processor;
pub mod validate;

// Re-exports for convenient access
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use load::{ImageLoader, LoadedImage};
pub use processor::ImageProcessor;
pub use validate::Validator;
