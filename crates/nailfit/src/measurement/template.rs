//! Anatomical default measurements per finger type.

use crate::finger::{FingerName, FingerPosition, ShapeCategory, SourceKind};

use super::{FingerMeasurement, PixelMeasurements};

/// Scale used for template records when no calibration is available
/// (96 DPI screen pixels).
pub const DEFAULT_PIXELS_PER_MM: f64 = 96.0 / 25.4;

/// Curvature assigned to template records.
pub const TEMPLATE_CURVATURE: f64 = 0.35;

/// Adult default lengths for one finger type, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerTemplate {
    pub nail_width_mm: f64,
    pub nail_length_mm: f64,
    pub finger_width_mm: f64,
    pub finger_length_mm: f64,
}

/// Default lengths by finger name; the same for both hands.
pub fn template_for(finger: FingerName) -> FingerTemplate {
    let [nail_width_mm, nail_length_mm, finger_width_mm, finger_length_mm] = match finger {
        FingerName::Thumb => [15.0, 14.5, 20.0, 60.0],
        FingerName::Index => [12.0, 12.5, 16.0, 75.0],
        FingerName::Middle => [12.5, 13.5, 16.5, 80.0],
        FingerName::Ring => [11.5, 12.5, 15.5, 75.0],
        FingerName::Pinky => [9.5, 10.5, 13.5, 60.0],
    };
    FingerTemplate {
        nail_width_mm,
        nail_length_mm,
        finger_width_mm,
        finger_length_mm,
    }
}

/// Template record for `position` expressed in the session's pixel domain.
pub(crate) fn template_measurement(
    position: FingerPosition,
    pixels_per_mm: Option<f64>,
    confidence: f64,
) -> FingerMeasurement {
    let scale = pixels_per_mm
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(DEFAULT_PIXELS_PER_MM);
    let t = template_for(position.finger());
    let pixels = PixelMeasurements {
        nail_width_px: t.nail_width_mm * scale,
        nail_length_px: t.nail_length_mm * scale,
        finger_width_px: t.finger_width_mm * scale,
        finger_length_px: t.finger_length_mm * scale,
    };
    FingerMeasurement::from_pixels(
        position,
        pixels,
        scale,
        ShapeCategory::Oval,
        TEMPLATE_CURVATURE,
        confidence,
        SourceKind::InferredFromTemplate,
    )
}
