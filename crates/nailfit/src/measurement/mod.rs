//! Finger measurement records and the ten-finger measurement set.
//!
//! A [`FingerMeasurement`] keeps its pixel values together with the scale they
//! were converted with; the millimeter values are derived from those two at
//! construction (and again on deserialization) and never set independently.

mod completion;
mod extract;
mod template;

pub use completion::{complete_measurements, PAIR_CONFIDENCE_FACTOR, TEMPLATE_CONFIDENCE};
pub use extract::{extract_finger, EXTRACTION_FAILURE_CONFIDENCE, MAX_FINGER_MM, MAX_NAIL_MM};
pub use template::{template_for, FingerTemplate, DEFAULT_PIXELS_PER_MM, TEMPLATE_CURVATURE};

use crate::calibration::px_to_mm;
use crate::finger::{FingerPosition, ShapeCategory, SourceKind};

/// Raw pixel lengths for one finger.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PixelMeasurements {
    pub nail_width_px: f64,
    pub nail_length_px: f64,
    pub finger_width_px: f64,
    pub finger_length_px: f64,
}

/// One finger's measurement record.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(from = "StoredMeasurement")]
pub struct FingerMeasurement {
    position: FingerPosition,
    #[serde(flatten)]
    pixels: PixelMeasurements,
    pixels_per_mm: f64,
    nail_width_mm: f64,
    nail_length_mm: f64,
    finger_width_mm: f64,
    finger_length_mm: f64,
    curvature: f64,
    shape_category: ShapeCategory,
    confidence: f64,
    source_kind: SourceKind,
}

/// Serialized form; millimeter members are ignored and recomputed.
#[derive(serde::Deserialize)]
struct StoredMeasurement {
    position: FingerPosition,
    #[serde(flatten)]
    pixels: PixelMeasurements,
    pixels_per_mm: f64,
    curvature: f64,
    shape_category: ShapeCategory,
    confidence: f64,
    source_kind: SourceKind,
}

impl From<StoredMeasurement> for FingerMeasurement {
    fn from(s: StoredMeasurement) -> Self {
        Self::from_pixels(
            s.position,
            s.pixels,
            s.pixels_per_mm,
            s.shape_category,
            s.curvature,
            s.confidence,
            s.source_kind,
        )
    }
}

impl FingerMeasurement {
    /// Build a record from pixel lengths; millimeters are `px / pixels_per_mm`.
    ///
    /// `curvature` and `confidence` are clamped to `[0, 1]`.
    pub fn from_pixels(
        position: FingerPosition,
        pixels: PixelMeasurements,
        pixels_per_mm: f64,
        shape_category: ShapeCategory,
        curvature: f64,
        confidence: f64,
        source_kind: SourceKind,
    ) -> Self {
        Self {
            position,
            pixels,
            pixels_per_mm,
            nail_width_mm: px_to_mm(pixels.nail_width_px, pixels_per_mm),
            nail_length_mm: px_to_mm(pixels.nail_length_px, pixels_per_mm),
            finger_width_mm: px_to_mm(pixels.finger_width_px, pixels_per_mm),
            finger_length_mm: px_to_mm(pixels.finger_length_px, pixels_per_mm),
            curvature: clamp_unit(curvature),
            shape_category,
            confidence: clamp_unit(confidence),
            source_kind,
        }
    }

    /// Copy of this record re-keyed to `position`, with confidence scaled.
    pub(crate) fn inferred_copy(
        &self,
        position: FingerPosition,
        confidence_factor: f64,
        source_kind: SourceKind,
    ) -> Self {
        Self {
            position,
            confidence: clamp_unit(self.confidence * confidence_factor),
            source_kind,
            ..self.clone()
        }
    }

    pub fn position(&self) -> FingerPosition {
        self.position
    }

    pub fn pixels(&self) -> PixelMeasurements {
        self.pixels
    }

    pub fn pixels_per_mm(&self) -> f64 {
        self.pixels_per_mm
    }

    pub fn nail_width_px(&self) -> f64 {
        self.pixels.nail_width_px
    }

    pub fn nail_length_px(&self) -> f64 {
        self.pixels.nail_length_px
    }

    pub fn nail_width_mm(&self) -> f64 {
        self.nail_width_mm
    }

    pub fn nail_length_mm(&self) -> f64 {
        self.nail_length_mm
    }

    pub fn finger_width_mm(&self) -> f64 {
        self.finger_width_mm
    }

    pub fn finger_length_mm(&self) -> f64 {
        self.finger_length_mm
    }

    /// `0` = flat, `1` = highly curved.
    pub fn curvature(&self) -> f64 {
        self.curvature
    }

    pub fn shape_category(&self) -> ShapeCategory {
        self.shape_category
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    /// `true` when every length is zero (a failed extraction).
    pub fn is_zeroed(&self) -> bool {
        let p = self.pixels;
        p.nail_width_px == 0.0
            && p.nail_length_px == 0.0
            && p.finger_width_px == 0.0
            && p.finger_length_px == 0.0
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Exactly ten measurement records, one per canonical position.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "StoredMeasurementSet")]
pub struct MeasurementSet {
    records: Vec<FingerMeasurement>,
    overall_confidence: f64,
    recommendations: Vec<String>,
}

#[derive(serde::Deserialize)]
struct StoredMeasurementSet {
    records: Vec<FingerMeasurement>,
    #[serde(default)]
    recommendations: Vec<String>,
}

impl TryFrom<StoredMeasurementSet> for MeasurementSet {
    type Error = String;

    fn try_from(s: StoredMeasurementSet) -> Result<Self, Self::Error> {
        Self::new(s.records, s.recommendations)
    }
}

impl MeasurementSet {
    /// Build a set from records in any order.
    ///
    /// Fails unless every canonical position appears exactly once. The overall
    /// confidence is the mean of the ten record confidences.
    pub fn new(
        mut records: Vec<FingerMeasurement>,
        recommendations: Vec<String>,
    ) -> Result<Self, String> {
        if records.len() != FingerPosition::COUNT {
            return Err(format!(
                "measurement set needs {} records (got {})",
                FingerPosition::COUNT,
                records.len()
            ));
        }
        records.sort_by_key(|r| r.position());
        for (expected, r) in FingerPosition::ALL.iter().zip(&records) {
            if r.position() != *expected {
                return Err(format!("measurement set is missing {}", expected.label()));
            }
        }
        let overall_confidence =
            records.iter().map(|r| r.confidence()).sum::<f64>() / FingerPosition::COUNT as f64;
        Ok(Self {
            records,
            overall_confidence,
            recommendations,
        })
    }

    /// Build from records already in canonical order.
    pub(crate) fn from_canonical(
        records: [FingerMeasurement; FingerPosition::COUNT],
        recommendations: Vec<String>,
    ) -> Self {
        debug_assert!(records
            .iter()
            .zip(FingerPosition::ALL)
            .all(|(r, p)| r.position() == p));
        let overall_confidence =
            records.iter().map(|r| r.confidence()).sum::<f64>() / FingerPosition::COUNT as f64;
        Self {
            records: records.into(),
            overall_confidence,
            recommendations,
        }
    }

    /// Records in canonical order.
    pub fn records(&self) -> &[FingerMeasurement] {
        &self.records
    }

    pub fn get(&self, position: FingerPosition) -> &FingerMeasurement {
        &self.records[position.index()]
    }

    pub fn overall_confidence(&self) -> f64 {
        self.overall_confidence
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Number of records taken from the finger's own photo.
    pub fn measured_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.source_kind() == SourceKind::Measured)
            .count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
