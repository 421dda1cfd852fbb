//! Completion of a partial capture into the full ten-finger set.
//!
//! Missing fingers are filled in two tiers: the same finger on the other hand
//! when it was captured, otherwise the anatomical template. Only captured
//! records serve as pair sources, so an inferred record is never copied again
//! and the pair factor applies exactly once.

use crate::calibration::ReferenceCalibration;
use crate::finger::{FingerPosition, SourceKind};

use super::template::template_measurement;
use super::{FingerMeasurement, MeasurementSet};

/// Confidence multiplier for a record copied from the mirrored finger.
pub const PAIR_CONFIDENCE_FACTOR: f64 = 0.7;
/// Confidence of a template record.
pub const TEMPLATE_CONFIDENCE: f64 = 0.3;
/// Reference detections below this confidence raise a recommendation.
pub(crate) const LOW_REFERENCE_CONFIDENCE: f64 = 0.5;

/// Complete `captured` (0..=10 records) into a [`MeasurementSet`].
///
/// Captured records are kept as they are, including failed extractions. When
/// a position appears more than once the first record wins. `calibration`
/// supplies the pixel scale for template records; without a detected
/// calibration the default scale is used.
pub fn complete_measurements(
    captured: &[FingerMeasurement],
    calibration: Option<&ReferenceCalibration>,
) -> MeasurementSet {
    let mut slots: [Option<&FingerMeasurement>; FingerPosition::COUNT] =
        [None; FingerPosition::COUNT];
    for m in captured {
        let slot = &mut slots[m.position().index()];
        if slot.is_some() {
            tracing::warn!(position = %m.position(), "duplicate measurement ignored");
            continue;
        }
        *slot = Some(m);
    }

    let scale = calibration
        .filter(|c| c.detected)
        .map(|c| c.pixels_per_mm);

    let mut recommendations = Vec::new();
    match calibration {
        Some(c) if c.detected && c.detection_confidence < LOW_REFERENCE_CONFIDENCE => {
            recommendations.push(
                "reference object not clearly visible; measurements may be less accurate"
                    .to_string(),
            );
        }
        Some(c) if c.detected => {}
        _ => recommendations.push(
            "no reference calibration available; estimated sizes use a default scale".to_string(),
        ),
    }

    let records: [FingerMeasurement; FingerPosition::COUNT] = std::array::from_fn(|idx| {
        let position = FingerPosition::ALL[idx];
        if let Some(m) = slots[idx] {
            if m.is_zeroed() {
                recommendations.push(format!(
                    "could not measure {} from its photo; consider retaking it",
                    position.label()
                ));
            }
            return m.clone();
        }

        let mirror = position.mirrored();
        if let Some(source) = slots[mirror.index()] {
            recommendations.push(format!(
                "{} estimated from {}",
                position.label(),
                mirror.label()
            ));
            return source.inferred_copy(
                position,
                PAIR_CONFIDENCE_FACTOR,
                SourceKind::InferredFromPair,
            );
        }

        recommendations.push(format!(
            "no data available for {}; using anatomical default",
            position.label()
        ));
        template_measurement(position, scale, TEMPLATE_CONFIDENCE)
    });

    let set = MeasurementSet::from_canonical(records, recommendations);
    tracing::info!(
        measured = set.measured_count(),
        overall_confidence = set.overall_confidence(),
        "measurement set completed"
    );
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{calibration_from_detection, ReferenceObjectSpec};
    use crate::finger::ShapeCategory;
    use crate::measurement::extract::failed_measurement;
    use crate::measurement::template::DEFAULT_PIXELS_PER_MM;
    use crate::measurement::PixelMeasurements;
    use crate::oracle::ReferenceDetection;
    use approx::assert_abs_diff_eq;

    fn calibration(confidence: f64) -> ReferenceCalibration {
        calibration_from_detection(
            ReferenceDetection::Detected {
                pixel_width: 324.0,
                pixel_height: 204.0,
                confidence,
            },
            &ReferenceObjectSpec::default(),
        )
    }

    fn measured(position: FingerPosition, confidence: f64) -> FingerMeasurement {
        FingerMeasurement::from_pixels(
            position,
            PixelMeasurements {
                nail_width_px: 50.0 + position.index() as f64,
                nail_length_px: 48.0,
                finger_width_px: 66.0,
                finger_length_px: 270.0,
            },
            324.0 / 85.60,
            ShapeCategory::Almond,
            0.6,
            confidence,
            SourceKind::Measured,
        )
    }

    #[test]
    fn always_yields_ten_records_for_any_subset() {
        let cal = calibration(0.9);
        for k in 0..=FingerPosition::COUNT {
            let captured: Vec<_> = FingerPosition::ALL[..k]
                .iter()
                .map(|p| measured(*p, 0.8))
                .collect();
            let set = complete_measurements(&captured, Some(&cal));
            assert_eq!(set.len(), FingerPosition::COUNT);
            for (r, p) in set.records().iter().zip(FingerPosition::ALL) {
                assert_eq!(r.position(), p);
            }
            assert_eq!(set.measured_count(), k);
        }
    }

    #[test]
    fn mirrored_pair_scales_confidence_once() {
        let cal = calibration(0.9);
        let src = measured(FingerPosition::LeftRing, 0.8);
        let set = complete_measurements(std::slice::from_ref(&src), Some(&cal));
        let inferred = set.get(FingerPosition::RightRing);
        assert_eq!(inferred.source_kind(), SourceKind::InferredFromPair);
        assert_abs_diff_eq!(inferred.confidence(), 0.7 * 0.8, epsilon = 1e-12);
        assert_eq!(inferred.nail_width_mm(), src.nail_width_mm());
        assert_eq!(inferred.shape_category(), ShapeCategory::Almond);
        assert!(set
            .recommendations()
            .iter()
            .any(|r| r == "right ring estimated from left ring"));
    }

    #[test]
    fn template_records_are_exactly_point_three() {
        let cal = calibration(0.9);
        let set = complete_measurements(&[measured(FingerPosition::LeftIndex, 0.9)], Some(&cal));
        let thumb = set.get(FingerPosition::RightThumb);
        assert_eq!(thumb.source_kind(), SourceKind::InferredFromTemplate);
        assert_eq!(thumb.confidence(), TEMPLATE_CONFIDENCE);
        assert_eq!(thumb.shape_category(), ShapeCategory::Oval);
        assert_eq!(thumb.curvature(), 0.35);
        assert_abs_diff_eq!(thumb.pixels_per_mm(), cal.pixels_per_mm, epsilon = 1e-12);
        let template_recs = set
            .recommendations()
            .iter()
            .filter(|r| r.starts_with("no data available for"))
            .count();
        assert_eq!(template_recs, 8);
        assert!(set
            .recommendations()
            .iter()
            .any(|r| r == "no data available for right thumb; using anatomical default"));
    }

    #[test]
    fn measured_confidence_is_never_upgraded() {
        let cal = calibration(0.9);
        let failed = failed_measurement(FingerPosition::LeftPinky, cal.pixels_per_mm);
        let set = complete_measurements(&[failed.clone()], Some(&cal));
        let kept = set.get(FingerPosition::LeftPinky);
        assert_eq!(kept, &failed);
        assert_eq!(kept.confidence(), 0.1);
        let mirror = set.get(FingerPosition::RightPinky);
        assert_eq!(mirror.source_kind(), SourceKind::InferredFromPair);
        assert_abs_diff_eq!(mirror.confidence(), 0.07, epsilon = 1e-12);
        assert!(set
            .recommendations()
            .iter()
            .any(|r| r.contains("could not measure left pinky")));
    }

    #[test]
    fn overall_confidence_is_mean_of_all_ten() {
        let cal = calibration(0.9);
        let captured = [
            measured(FingerPosition::LeftThumb, 1.0),
            measured(FingerPosition::LeftIndex, 0.5),
        ];
        let set = complete_measurements(&captured, Some(&cal));
        // 1.0 + 0.5 + pair(0.7 + 0.35) + 6 templates at 0.3
        let expected = (1.0 + 0.5 + 0.7 + 0.35 + 6.0 * 0.3) / 10.0;
        assert_abs_diff_eq!(set.overall_confidence(), expected, epsilon = 1e-12);
    }

    #[test]
    fn duplicates_keep_first_record() {
        let cal = calibration(0.9);
        let first = measured(FingerPosition::RightIndex, 0.9);
        let second = measured(FingerPosition::RightIndex, 0.2);
        let set = complete_measurements(&[first.clone(), second], Some(&cal));
        assert_eq!(set.get(FingerPosition::RightIndex), &first);
    }

    #[test]
    fn without_calibration_templates_use_default_scale() {
        let set = complete_measurements(&[], None);
        for r in set.records() {
            assert_eq!(r.source_kind(), SourceKind::InferredFromTemplate);
            assert_eq!(r.pixels_per_mm(), DEFAULT_PIXELS_PER_MM);
        }
        assert_abs_diff_eq!(set.overall_confidence(), 0.3, epsilon = 1e-12);
        assert!(set
            .recommendations()
            .iter()
            .any(|r| r.contains("no reference calibration")));
    }

    #[test]
    fn low_reference_confidence_is_flagged() {
        let cal = calibration(0.3);
        let set = complete_measurements(&[], Some(&cal));
        assert!(set
            .recommendations()
            .iter()
            .any(|r| r.contains("reference object not clearly visible")));
    }
}
