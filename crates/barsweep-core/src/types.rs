//! Core data types for the barsweep scanning pipeline.
//!
//! A scan produces exactly one [`DecodeOutcome`] per discovered file; a batch
//! of outcomes folds into a [`BatchSummary`].

use serde::{Deserialize, Serialize};

/// One step of a rotation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeAttempt {
    /// Rotation applied before decoding, in degrees
    pub angle: u32,

    /// First barcode text the decoder returned, if any
    pub result: Option<String>,
}

/// Terminal status of a scanned image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecodeStatus {
    /// A barcode was read at some angle of the sweep
    Decoded,
    /// Every angle was tried without a result
    NotDecoded,
    /// The image could not be loaded; the sweep never ran
    LoadFailed,
}

impl std::fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeStatus::Decoded => write!(f, "DECODED"),
            DecodeStatus::NotDecoded => write!(f, "NOT_DECODED"),
            DecodeStatus::LoadFailed => write!(f, "LOAD_FAILED"),
        }
    }
}

/// The result of scanning one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOutcome {
    /// Terminal status
    pub status: DecodeStatus,

    /// Decoded text (only for `DECODED`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode_text: Option<String>,

    /// Angle that produced the decode, absent when the unrotated image decoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_angle: Option<u32>,

    /// Where the image came from (usually its path)
    pub source: String,

    /// Number of decoder invocations made
    pub attempts: u32,

    /// Why the image could not be loaded (only for `LOAD_FAILED`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DecodeOutcome {
    /// A successful decode. An angle of 0 is recorded as no rotation.
    pub fn decoded(
        source: impl Into<String>,
        barcode_text: impl Into<String>,
        angle: u32,
        attempts: u32,
    ) -> Self {
        Self {
            status: DecodeStatus::Decoded,
            barcode_text: Some(barcode_text.into()),
            rotation_angle: (angle != 0).then_some(angle),
            source: source.into(),
            attempts,
            error: None,
        }
    }

    /// A sweep that exhausted every angle.
    pub fn not_decoded(source: impl Into<String>, attempts: u32) -> Self {
        Self {
            status: DecodeStatus::NotDecoded,
            barcode_text: None,
            rotation_angle: None,
            source: source.into(),
            attempts,
            error: None,
        }
    }

    /// An image that never reached the sweep.
    pub fn load_failed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: DecodeStatus::LoadFailed,
            barcode_text: None,
            rotation_angle: None,
            source: source.into(),
            attempts: 0,
            error: Some(reason.into()),
        }
    }

    /// True when the decode needed a non-zero rotation.
    pub fn is_rotated(&self) -> bool {
        self.status == DecodeStatus::Decoded && self.rotation_angle.is_some()
    }
}

/// Aggregate counts for a batch of outcomes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Images with status `DECODED`
    pub decoded: usize,

    /// Images with status `NOT_DECODED`
    pub not_decoded: usize,

    /// Images with status `LOAD_FAILED`
    pub load_failed: usize,

    /// Decoded images that needed rotation, in the order they were recorded
    pub rotated: Vec<DecodeOutcome>,
}

impl BatchSummary {
    /// Fold a sequence of outcomes into a summary, preserving their order.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a DecodeOutcome>) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            summary.record(outcome);
        }
        summary
    }

    /// Count one outcome.
    pub fn record(&mut self, outcome: &DecodeOutcome) {
        match outcome.status {
            DecodeStatus::Decoded => {
                self.decoded += 1;
                if outcome.is_rotated() {
                    self.rotated.push(outcome.clone());
                }
            }
            DecodeStatus::NotDecoded => self.not_decoded += 1,
            DecodeStatus::LoadFailed => self.load_failed += 1,
        }
    }

    /// Total number of outcomes recorded.
    pub fn total(&self) -> usize {
        self.decoded + self.not_decoded + self.load_failed
    }

    /// Percentage of swept images that decoded.
    ///
    /// Load failures are excluded from the denominator. Returns `None` when no
    /// image reached the sweep.
    pub fn success_rate(&self) -> Option<f64> {
        let swept = self.decoded + self.not_decoded;
        if swept == 0 {
            None
        } else {
            Some(100.0 * self.decoded as f64 / swept as f64)
        }
    }
}
