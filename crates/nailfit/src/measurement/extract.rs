//! Single-finger measurement extraction.

use crate::calibration::ReferenceCalibration;
use crate::finger::{FingerPosition, ShapeCategory, SourceKind};
use crate::oracle::{FingerObservation, Photo, VisionOracle};

use super::{FingerMeasurement, PixelMeasurements};

/// Confidence assigned to a finger whose photo could not be measured.
pub const EXTRACTION_FAILURE_CONFIDENCE: f64 = 0.1;
/// Largest plausible nail width or length.
pub const MAX_NAIL_MM: f64 = 40.0;
/// Largest plausible finger width or length.
pub const MAX_FINGER_MM: f64 = 200.0;

/// Measure one finger photo.
///
/// Oracle failures (transport, missing or invalid members) do not propagate:
/// the finger gets a zeroed record with confidence
/// [`EXTRACTION_FAILURE_CONFIDENCE`], still tagged as measured. Observations
/// outside [`MAX_NAIL_MM`] / [`MAX_FINGER_MM`] are treated the same way.
pub fn extract_finger(
    oracle: &dyn VisionOracle,
    photo: &Photo,
    position: FingerPosition,
    calibration: &ReferenceCalibration,
) -> FingerMeasurement {
    let pixels_per_mm = calibration.pixels_per_mm;
    match oracle.measure_finger(photo, position, pixels_per_mm) {
        Ok(obs) => {
            let m = measurement_from_observation(position, &obs, pixels_per_mm);
            if !is_plausible(&m) {
                tracing::warn!(
                    position = %position,
                    photo = photo.name(),
                    nail_width_mm = m.nail_width_mm(),
                    nail_length_mm = m.nail_length_mm(),
                    finger_width_mm = m.finger_width_mm(),
                    finger_length_mm = m.finger_length_mm(),
                    "finger measurement out of range; using low-confidence placeholder"
                );
                return failed_measurement(position, pixels_per_mm);
            }
            tracing::debug!(
                position = %position,
                nail_width_mm = m.nail_width_mm(),
                nail_length_mm = m.nail_length_mm(),
                confidence = m.confidence(),
                "finger measured"
            );
            m
        }
        Err(err) => {
            tracing::warn!(
                position = %position,
                photo = photo.name(),
                error = %err,
                "finger measurement failed; using low-confidence placeholder"
            );
            failed_measurement(position, pixels_per_mm)
        }
    }
}

pub(crate) fn measurement_from_observation(
    position: FingerPosition,
    obs: &FingerObservation,
    pixels_per_mm: f64,
) -> FingerMeasurement {
    FingerMeasurement::from_pixels(
        position,
        PixelMeasurements {
            nail_width_px: obs.nail_width_px,
            nail_length_px: obs.nail_length_px,
            finger_width_px: obs.finger_width_px,
            finger_length_px: obs.finger_length_px,
        },
        pixels_per_mm,
        obs.shape,
        obs.curvature,
        obs.confidence,
        SourceKind::Measured,
    )
}

fn is_plausible(m: &FingerMeasurement) -> bool {
    let within = |mm: f64, max: f64| mm.is_finite() && mm <= max;
    within(m.nail_width_mm(), MAX_NAIL_MM)
        && within(m.nail_length_mm(), MAX_NAIL_MM)
        && within(m.finger_width_mm(), MAX_FINGER_MM)
        && within(m.finger_length_mm(), MAX_FINGER_MM)
}

/// Zeroed record for a finger whose photo existed but could not be measured.
pub(crate) fn failed_measurement(position: FingerPosition, pixels_per_mm: f64) -> FingerMeasurement {
    FingerMeasurement::from_pixels(
        position,
        PixelMeasurements::default(),
        pixels_per_mm,
        ShapeCategory::Oval,
        0.0,
        EXTRACTION_FAILURE_CONFIDENCE,
        SourceKind::Measured,
    )
}
