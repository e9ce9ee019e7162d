//! Decoder backed by `rxing`, a pure-Rust port of ZXing.

use std::collections::{HashMap, HashSet};

use ::rxing::{BarcodeFormat, DecodeHintType, DecodeHintValue, DecodingHintDictionary};
use image::DynamicImage;

use super::{BarcodeDecoder, Symbology};

/// Multi-format barcode reader using rxing's luma detection.
pub struct RxingDecoder {
    formats: Vec<Symbology>,
}

impl RxingDecoder {
    /// Create a reader. An empty `formats` list accepts every symbology.
    pub fn new(formats: Vec<Symbology>) -> Self {
        Self { formats }
    }

    /// Detection hints restricting rxing to the configured symbologies.
    fn hints(&self) -> DecodingHintDictionary {
        let mut hints = HashMap::new();
        if !self.formats.is_empty() {
            let formats: HashSet<BarcodeFormat> =
                self.formats.iter().copied().map(to_barcode_format).collect();
            hints.insert(
                DecodeHintType::POSSIBLE_FORMATS,
                DecodeHintValue::PossibleFormats(formats),
            );
        }
        hints
    }
}

impl BarcodeDecoder for RxingDecoder {
    fn name(&self) -> &str {
        "rxing"
    }

    fn decode(&self, image: &DynamicImage) -> Vec<String> {
        let luma = image.to_luma8();
        let (width, height) = luma.dimensions();

        let mut hints = self.hints();
        match ::rxing::helpers::detect_multiple_in_luma_with_hints(
            luma.into_raw(),
            width,
            height,
            &mut hints,
        ) {
            Ok(results) => results.iter().map(|r| r.getText().to_string()).collect(),
            Err(e) => {
                // rxing reports "nothing found" as an error
                tracing::trace!("rxing found no barcode: {e}");
                Vec::new()
            }
        }
    }
}

fn to_barcode_format(symbology: Symbology) -> BarcodeFormat {
    match symbology {
        Symbology::Aztec => BarcodeFormat::AZTEC,
        Symbology::Codabar => BarcodeFormat::CODABAR,
        Symbology::Code39 => BarcodeFormat::CODE_39,
        Symbology::Code93 => BarcodeFormat::CODE_93,
        Symbology::Code128 => BarcodeFormat::CODE_128,
        Symbology::DataMatrix => BarcodeFormat::DATA_MATRIX,
        Symbology::Ean8 => BarcodeFormat::EAN_8,
        Symbology::Ean13 => BarcodeFormat::EAN_13,
        Symbology::Itf => BarcodeFormat::ITF,
        Symbology::MaxiCode => BarcodeFormat::MAXICODE,
        Symbology::Pdf417 => BarcodeFormat::PDF_417,
        Symbology::QrCode => BarcodeFormat::QR_CODE,
        Symbology::UpcA => BarcodeFormat::UPC_A,
        Symbology::UpcE => BarcodeFormat::UPC_E,
    }
}
