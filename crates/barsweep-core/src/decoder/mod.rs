//! Barcode decoder trait, closure adapter, and backend factory.
//!
//! The sweep only ever talks to a [`BarcodeDecoder`]. Backends are picked by
//! name from config so a different reader can be dropped in without touching
//! the sweep, and tests can inject a [`FnDecoder`].

mod rxing_backend;

pub use rxing_backend::RxingDecoder;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::config::DecoderConfig;
use crate::error::PipelineError;

/// Something that reads barcode text out of a raster image.
///
/// Implementations must be safe to call from several threads at once; the
/// batch runner shares one decoder across workers.
pub trait BarcodeDecoder: Send + Sync {
    /// Backend name for logging (e.g., "rxing").
    fn name(&self) -> &str;

    /// Decode every barcode found in the image.
    ///
    /// An empty vector means nothing was found. When several codes are found
    /// the first one is treated as the answer.
    fn decode(&self, image: &DynamicImage) -> Vec<String>;
}

/// Adapts a closure into a [`BarcodeDecoder`].
pub struct FnDecoder<F> {
    name: String,
    f: F,
}

impl<F> FnDecoder<F>
where
    F: Fn(&DynamicImage) -> Vec<String> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> BarcodeDecoder for FnDecoder<F>
where
    F: Fn(&DynamicImage) -> Vec<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn decode(&self, image: &DynamicImage) -> Vec<String> {
        (self.f)(image)
    }
}

/// Barcode symbologies that can be used to filter decoder results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    DataMatrix,
    Ean8,
    Ean13,
    Itf,
    MaxiCode,
    Pdf417,
    QrCode,
    UpcA,
    UpcE,
}

impl Symbology {
    /// Parse a symbology name, ignoring case, `-` and `_`.
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "aztec" => Some(Self::Aztec),
            "codabar" => Some(Self::Codabar),
            "code39" => Some(Self::Code39),
            "code93" => Some(Self::Code93),
            "code128" => Some(Self::Code128),
            "datamatrix" => Some(Self::DataMatrix),
            "ean8" => Some(Self::Ean8),
            "ean13" => Some(Self::Ean13),
            "itf" => Some(Self::Itf),
            "maxicode" => Some(Self::MaxiCode),
            "pdf417" => Some(Self::Pdf417),
            "qr" | "qrcode" => Some(Self::QrCode),
            "upca" => Some(Self::UpcA),
            "upce" => Some(Self::UpcE),
            _ => None,
        }
    }
}

/// Creates the configured decoder backend.
pub struct DecoderFactory;

impl DecoderFactory {
    /// Create a decoder for `config.backend`.
    ///
    /// # Arguments
    /// * `config` - Decoder section of the config (backend name, symbology filter)
    pub fn create(config: &DecoderConfig) -> Result<Box<dyn BarcodeDecoder>, PipelineError> {
        match config.backend.to_lowercase().as_str() {
            "rxing" | "zxing" => Ok(Box::new(RxingDecoder::new(config.formats.clone()))),
            other => Err(PipelineError::UnknownDecoder(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_decoder_delegates() {
        let decoder = FnDecoder::new("const", |_: &DynamicImage| vec!["42".to_string()]);
        assert_eq!(decoder.name(), "const");
        assert_eq!(decoder.decode(&DynamicImage::new_luma8(2, 2)), vec!["42"]);
    }

    #[test]
    fn test_symbology_parse() {
        assert_eq!(Symbology::parse("data_matrix"), Some(Symbology::DataMatrix));
        assert_eq!(Symbology::parse("DataMatrix"), Some(Symbology::DataMatrix));
        assert_eq!(Symbology::parse("qr"), Some(Symbology::QrCode));
        assert_eq!(Symbology::parse("code-128"), Some(Symbology::Code128));
        assert_eq!(Symbology::parse("EAN13"), Some(Symbology::Ean13));
        assert_eq!(Symbology::parse("hologram"), None);
    }

    #[test]
    fn test_symbology_serde_names() {
        let json = serde_json::to_string(&Symbology::DataMatrix).unwrap();
        assert_eq!(json, "\"data_matrix\"");
        let parsed: Symbology = serde_json::from_str("\"qr_code\"").unwrap();
        assert_eq!(parsed, Symbology::QrCode);
    }

    #[test]
    fn test_factory_creates_rxing() {
        let decoder = DecoderFactory::create(&DecoderConfig::default()).unwrap();
        assert_eq!(decoder.name(), "rxing");
    }

    #[test]
    fn test_factory_rejects_unknown_backend() {
        let config = DecoderConfig {
            backend: "dynamsoft".to_string(),
            formats: vec![],
        };
        let err = DecoderFactory::create(&config).err().unwrap();
        assert!(err.to_string().contains("dynamsoft"));
    }
}
