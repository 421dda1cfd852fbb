//! Reference-card calibration: photo scale from an object of known size.
//!
//! The scale factor is taken from the object's width, the more stable axis
//! under perspective. The height-derived scale is kept for diagnostics only.

use thiserror::Error;

use crate::oracle::{Photo, ReferenceDetection, VisionOracle};

/// ISO/IEC 7810 ID-1 card width (credit/ID card).
pub const ID1_CARD_WIDTH_MM: f64 = 85.60;
/// ISO/IEC 7810 ID-1 card height.
pub const ID1_CARD_HEIGHT_MM: f64 = 53.98;
/// Smallest reference width, in photo pixels, accepted as a usable scale.
pub const DEFAULT_MIN_REFERENCE_PIXEL_WIDTH: f64 = 20.0;

/// Physical dimensions of the reference object.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReferenceObjectSpec {
    pub name: String,
    pub width_mm: f64,
    pub height_mm: f64,
    /// Detections narrower than this many pixels are rejected as implausible.
    pub min_pixel_width: f64,
}

impl Default for ReferenceObjectSpec {
    fn default() -> Self {
        Self {
            name: "id1_card".to_string(),
            width_mm: ID1_CARD_WIDTH_MM,
            height_mm: ID1_CARD_HEIGHT_MM,
            min_pixel_width: DEFAULT_MIN_REFERENCE_PIXEL_WIDTH,
        }
    }
}

impl ReferenceObjectSpec {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !self.width_mm.is_finite() || self.width_mm <= 0.0 {
            return Err("reference.width_mm must be finite and > 0".to_string());
        }
        if !self.height_mm.is_finite() || self.height_mm <= 0.0 {
            return Err("reference.height_mm must be finite and > 0".to_string());
        }
        if !self.min_pixel_width.is_finite() || self.min_pixel_width < 0.0 {
            return Err("reference.min_pixel_width must be finite and >= 0".to_string());
        }
        Ok(())
    }
}

/// Why a calibration attempt did not produce a usable scale.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum CalibrationFailureReason {
    /// The oracle saw no reference object.
    NotDetected,
    /// The oracle reported a pixel width that is zero or negative.
    NonPositiveWidth,
    /// The reported width is below the plausible minimum for a card in frame.
    ImplausibleWidth,
    /// The oracle call failed or returned an invalid response.
    OracleError(String),
}

/// Session-fatal calibration error.
#[derive(Debug, Clone, Error)]
#[error("reference object calibration failed for '{photo}': {reason:?}")]
pub struct CalibrationFailure {
    pub photo: String,
    pub reason: CalibrationFailureReason,
}

/// Scale of one session's photos.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReferenceCalibration {
    pub detected: bool,
    pub physical_width_mm: f64,
    pub physical_height_mm: f64,
    /// Photo pixels per millimeter, derived from the object width.
    pub pixels_per_mm: f64,
    /// Height-derived scale; informational.
    pub pixels_per_mm_y: f64,
    /// Detection confidence in `[0, 1]`.
    pub detection_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<CalibrationFailureReason>,
}

impl ReferenceCalibration {
    /// An undetected calibration carrying the reason.
    pub fn not_detected(spec: &ReferenceObjectSpec, reason: CalibrationFailureReason) -> Self {
        Self {
            detected: false,
            physical_width_mm: spec.width_mm,
            physical_height_mm: spec.height_mm,
            pixels_per_mm: 0.0,
            pixels_per_mm_y: 0.0,
            detection_confidence: 0.0,
            failure_reason: Some(reason),
        }
    }

    /// Convert a pixel length to millimeters.
    pub fn px_to_mm(&self, px: f64) -> f64 {
        px_to_mm(px, self.pixels_per_mm)
    }

    /// Convert a millimeter length to pixels.
    pub fn mm_to_px(&self, mm: f64) -> f64 {
        mm * self.pixels_per_mm
    }

    /// Turn `detected: false` into the session error.
    pub fn require_detected(&self, photo: &str) -> Result<&Self, CalibrationFailure> {
        if self.detected {
            return Ok(self);
        }
        Err(CalibrationFailure {
            photo: photo.to_string(),
            reason: self
                .failure_reason
                .clone()
                .unwrap_or(CalibrationFailureReason::NotDetected),
        })
    }
}

/// Pixel length to millimeters; zero for an unusable scale.
pub(crate) fn px_to_mm(px: f64, pixels_per_mm: f64) -> f64 {
    if pixels_per_mm > 0.0 && pixels_per_mm.is_finite() {
        px / pixels_per_mm
    } else {
        0.0
    }
}

/// Compute the photo scale from the reference object in `photo`.
///
/// Never fails: oracle errors, missing detections and non-positive or
/// implausibly small widths yield `detected: false`.
pub fn calibrate(
    oracle: &dyn VisionOracle,
    photo: &Photo,
    spec: &ReferenceObjectSpec,
) -> ReferenceCalibration {
    let detection = match oracle.detect_reference_object(photo) {
        Ok(d) => d,
        Err(err) => {
            tracing::warn!(photo = photo.name(), error = %err, "reference detection failed");
            return ReferenceCalibration::not_detected(
                spec,
                CalibrationFailureReason::OracleError(err.to_string()),
            );
        }
    };

    calibration_from_detection(detection, spec)
}

pub(crate) fn calibration_from_detection(
    detection: ReferenceDetection,
    spec: &ReferenceObjectSpec,
) -> ReferenceCalibration {
    let ReferenceDetection::Detected {
        pixel_width,
        pixel_height,
        confidence,
    } = detection
    else {
        tracing::warn!("reference object not detected");
        return ReferenceCalibration::not_detected(spec, CalibrationFailureReason::NotDetected);
    };

    if !(pixel_width.is_finite() && pixel_width > 0.0) {
        tracing::warn!(pixel_width, "reference object width is not positive");
        return ReferenceCalibration::not_detected(spec, CalibrationFailureReason::NonPositiveWidth);
    }
    if pixel_width < spec.min_pixel_width {
        tracing::warn!(
            pixel_width,
            min_pixel_width = spec.min_pixel_width,
            "reference object width is implausibly small"
        );
        return ReferenceCalibration::not_detected(spec, CalibrationFailureReason::ImplausibleWidth);
    }

    let pixels_per_mm = pixel_width / spec.width_mm;
    let pixels_per_mm_y = if pixel_height.is_finite() && pixel_height > 0.0 {
        pixel_height / spec.height_mm
    } else {
        0.0
    };

    tracing::info!(
        pixels_per_mm,
        pixels_per_mm_y,
        confidence,
        "reference calibration complete"
    );

    ReferenceCalibration {
        detected: true,
        physical_width_mm: spec.width_mm,
        physical_height_mm: spec.height_mm,
        pixels_per_mm,
        pixels_per_mm_y,
        detection_confidence: confidence.clamp(0.0, 1.0),
        failure_reason: None,
    }
}
