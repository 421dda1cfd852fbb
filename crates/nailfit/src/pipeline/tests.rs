use super::*;
use crate::artifact::Origin;
use crate::calibration::CalibrationFailureReason;
use crate::compositor::{target_pixel_size, MAX_PRINT_PX};
use crate::config::PipelineConfig;
use crate::design::{OfflineGenerator, StylePreferences};
use crate::finger::{FingerPosition, SourceKind};
use crate::measurement::EXTRACTION_FAILURE_CONFIDENCE;
use crate::oracle::{NailRegion, OracleError, ReferenceDetection, ReplayOracle};
use crate::session::SessionId;
use crate::storage::{FsSessionStorage, MemorySessionStorage, SessionStorage, StorageError};
use crate::test_utils::{
    blank_photo, observation, FlakyStorage, RecordingSleeper, ScriptedGenerator, ScriptedOracle,
};

const CAPTURED: [FingerPosition; 6] = [
    FingerPosition::LeftThumb,
    FingerPosition::LeftIndex,
    FingerPosition::LeftMiddle,
    FingerPosition::LeftRing,
    FingerPosition::LeftPinky,
    FingerPosition::RightIndex,
];

fn sid() -> SessionId {
    SessionId::new("session-001").expect("session id")
}

fn card() -> ReferenceDetection {
    ReferenceDetection::Detected {
        pixel_width: 324.0,
        pixel_height: 204.0,
        confidence: 0.92,
    }
}

/// Card plus the six captured fingers, no nail regions.
fn measured_oracle() -> ScriptedOracle {
    CAPTURED
        .iter()
        .enumerate()
        .fold(ScriptedOracle::default().with_reference(card()), |o, (i, p)| {
            o.with_finger(
                *p,
                Ok(observation(
                    44.0 + 2.0 * i as f64,
                    46.0 + i as f64,
                    62.0,
                    260.0,
                    0.8,
                )),
            )
        })
}

fn scripted_oracle() -> ScriptedOracle {
    measured_oracle().with_nail_region(
        FingerPosition::LeftIndex,
        NailRegion {
            x: 10,
            y: 8,
            width: 20,
            height: 24,
        },
    )
}

fn input() -> SessionInput {
    SessionInput {
        reference: blank_photo("card.jpg"),
        fingers: CAPTURED
            .iter()
            .map(|p| FingerPhoto {
                position: *p,
                photo: blank_photo(&format!("{}.jpg", p.slug())),
            })
            .collect(),
        style: None,
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        style: StylePreferences {
            style: "minimalist".to_string(),
            ..StylePreferences::default()
        },
        ..PipelineConfig::default()
    }
}

#[test]
fn generation_failures_are_isolated_per_finger() {
    let oracle = scripted_oracle();
    let generator = ScriptedGenerator::failing_at(&[2, 5, 9]);
    let storage = MemorySessionStorage::new();
    let sleeper = RecordingSleeper::default();
    let services = Services {
        oracle: &oracle,
        generator: &generator,
        storage: &storage,
        sleeper: &sleeper,
    };

    let report = run_session(&config(), &sid(), &input(), &services).expect("session");
    assert_eq!(report.artifacts.len(), 10);
    assert_eq!(report.fallback_count(), 3);
    assert_eq!(report.generated_count(), 7);
    for idx in [2, 5, 9] {
        assert_eq!(report.artifacts[idx].origin, Origin::Fallback);
        assert!(report.artifacts[idx].vector_ref.is_some());
    }
    assert!(report
        .artifacts
        .iter()
        .filter(|a| a.origin == Origin::Generated)
        .all(|a| a.vector_ref.is_none()));
    assert_eq!(sleeper.delays.borrow().len(), 7);
    assert_eq!(generator.calls.borrow().len(), 10);
}

#[test]
fn persisted_documents_match_the_report() {
    let oracle = scripted_oracle();
    let generator = ScriptedGenerator::new();
    let storage = MemorySessionStorage::new();
    let sleeper = RecordingSleeper::default();
    let services = Services {
        oracle: &oracle,
        generator: &generator,
        storage: &storage,
        sleeper: &sleeper,
    };
    let report = run_session(&config(), &sid(), &input(), &services).expect("session");

    let set = get_measurement_set(&storage, &sid()).expect("measurements");
    assert_eq!(set, report.measurements);
    assert_eq!(set.measured_count(), 6);
    assert_eq!(
        set.get(FingerPosition::RightThumb).source_kind(),
        SourceKind::InferredFromPair
    );
    assert_eq!(
        set.get(FingerPosition::RightMiddle).source_kind(),
        SourceKind::InferredFromPair
    );
    let artifacts = get_artifacts(&storage, &sid()).expect("artifacts");
    assert_eq!(artifacts, report.artifacts);
    let calibration = get_calibration(&storage, &sid()).expect("calibration");
    assert_eq!(calibration, report.calibration);

    for (a, p) in artifacts.iter().zip(FingerPosition::ALL) {
        assert_eq!(a.position, p);
    }
}

#[test]
fn artifacts_have_exact_physical_pixel_size() {
    let oracle = scripted_oracle();
    let storage = MemorySessionStorage::new();
    let services = Services {
        oracle: &oracle,
        generator: &ScriptedGenerator::failing_at(&[0, 7]),
        storage: &storage,
        sleeper: &RecordingSleeper::default(),
    };
    let cfg = config();
    let report = run_session(&cfg, &sid(), &input(), &services).expect("session");

    for (a, m) in report.artifacts.iter().zip(report.measurements.records()) {
        assert_eq!(a.physical_width_mm, m.nail_width_mm());
        assert_eq!(a.physical_height_mm, m.nail_length_mm());
        let expected = target_pixel_size(m.nail_width_mm(), m.nail_length_mm(), cfg.compositor.dpi);
        assert_eq!(a.pixel_size, expected);
        let key = format!("{}.png", a.position.slug());
        let bytes = storage.get(&sid(), &key).expect("stored png");
        let img = image::load_from_memory(&bytes).expect("png");
        assert_eq!([img.width(), img.height()], expected);
    }
}

#[test]
fn preview_only_where_a_nail_region_was_found() {
    let oracle = scripted_oracle();
    let storage = MemorySessionStorage::new();
    let services = Services {
        oracle: &oracle,
        generator: &ScriptedGenerator::new(),
        storage: &storage,
        sleeper: &RecordingSleeper::default(),
    };
    let report = run_session(&config(), &sid(), &input(), &services).expect("session");
    for a in &report.artifacts {
        assert_eq!(
            a.preview_ref.is_some(),
            a.position == FingerPosition::LeftIndex,
            "{}",
            a.position
        );
    }
    assert!(storage
        .list(&sid())
        .expect("list")
        .contains(&"left_index_preview.png".to_string()));
}

#[test]
fn failed_calibration_writes_nothing() {
    let oracle = scripted_oracle().with_reference(ReferenceDetection::NotDetected);
    let generator = ScriptedGenerator::new();
    let storage = MemorySessionStorage::new();
    let services = Services {
        oracle: &oracle,
        generator: &generator,
        storage: &storage,
        sleeper: &RecordingSleeper::default(),
    };
    let err = run_session(&config(), &sid(), &input(), &services).expect_err("fatal");
    match err {
        PipelineError::Calibration(f) => {
            assert_eq!(f.photo, "card.jpg");
            assert_eq!(f.reason, CalibrationFailureReason::NotDetected);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(storage.list(&sid()).expect("list").is_empty());
    assert!(oracle.finger_calls.borrow().is_empty());
    assert!(generator.calls.borrow().is_empty());
    assert!(get_measurement_set(&storage, &sid()).is_err());
    assert!(get_artifacts(&storage, &sid()).is_err());
}

#[test]
fn extraction_failure_is_absorbed() {
    let oracle = scripted_oracle().with_finger(
        FingerPosition::LeftRing,
        Err(OracleError::Backend("timeout".to_string())),
    );
    let storage = MemorySessionStorage::new();
    let services = Services {
        oracle: &oracle,
        generator: &OfflineGenerator,
        storage: &storage,
        sleeper: &RecordingSleeper::default(),
    };
    let report = run_session(&config(), &sid(), &input(), &services).expect("session");
    let ring = report.measurements.get(FingerPosition::LeftRing);
    assert!(ring.is_zeroed());
    assert_eq!(ring.confidence(), 0.1);
    assert!(report
        .measurements
        .recommendations()
        .iter()
        .any(|r| r.contains("could not measure left ring")));
    assert_eq!(report.fallback_count(), 10);
    assert_eq!(report.artifacts[3].pixel_size, [1, 1]);
}

#[test]
fn filesystem_session_layout() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = FsSessionStorage::new(dir.path());
    let oracle = scripted_oracle();
    let services = Services {
        oracle: &oracle,
        generator: &ScriptedGenerator::failing_at(&[4]),
        storage: &storage,
        sleeper: &RecordingSleeper::default(),
    };
    run_session(&config(), &sid(), &input(), &services).expect("session");

    let session_dir = dir.path().join("session-001");
    for name in [
        "calibration.json",
        "measurements.json",
        "artifacts.json",
        "left_thumb.png",
        "right_pinky.png",
        "left_pinky_fallback.svg",
    ] {
        assert!(session_dir.join(name).is_file(), "{name}");
    }
    let artifacts = get_artifacts(&storage, &sid()).expect("artifacts");
    assert!(artifacts[0]
        .image_ref
        .as_str()
        .ends_with("left_thumb.png"));
}

#[test]
fn implausible_reference_scale_fails_calibration() {
    let oracle = scripted_oracle().with_reference(ReferenceDetection::Detected {
        pixel_width: 1e-6,
        pixel_height: 1e-6,
        confidence: 0.9,
    });
    let storage = MemorySessionStorage::new();
    let services = Services {
        oracle: &oracle,
        generator: &ScriptedGenerator::new(),
        storage: &storage,
        sleeper: &RecordingSleeper::default(),
    };
    match run_session(&config(), &sid(), &input(), &services) {
        Err(PipelineError::Calibration(f)) => {
            assert_eq!(f.reason, CalibrationFailureReason::ImplausibleWidth);
        }
        other => panic!("expected calibration failure, got {other:?}"),
    }
    assert!(storage.list(&sid()).expect("list").is_empty());
}

#[test]
fn out_of_range_fingers_degrade_and_session_completes() {
    // Smallest accepted card width: every scripted finger comes out far too large.
    let small_card = measured_oracle().with_reference(ReferenceDetection::Detected {
        pixel_width: 20.0,
        pixel_height: 12.6,
        confidence: 0.9,
    });
    let huge = scripted_oracle().with_finger(
        FingerPosition::LeftRing,
        Ok(observation(1e9, 1e9, 1e9, 1e9, 0.95)),
    );
    for oracle in [small_card, huge] {
        let storage = MemorySessionStorage::new();
        let services = Services {
            oracle: &oracle,
            generator: &ScriptedGenerator::new(),
            storage: &storage,
            sleeper: &RecordingSleeper::default(),
        };
        let report = run_session(&config(), &sid(), &input(), &services).expect("session");
        assert_eq!(report.artifacts.len(), 10);

        let ring = report.measurements.get(FingerPosition::LeftRing);
        assert!(ring.is_zeroed());
        assert_eq!(ring.confidence(), EXTRACTION_FAILURE_CONFIDENCE);
        assert!(report
            .measurements
            .recommendations()
            .iter()
            .any(|r| r.contains("could not measure left ring")));
        for a in &report.artifacts {
            assert!(a.pixel_size.iter().all(|&px| (1..=MAX_PRINT_PX).contains(&px)));
        }
    }
}

#[test]
fn rerun_replaces_previous_session_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = FsSessionStorage::new(dir.path());
    let first = scripted_oracle();
    run_session(
        &config(),
        &sid(),
        &input(),
        &Services {
            oracle: &first,
            generator: &ScriptedGenerator::failing_at(&[4]),
            storage: &storage,
            sleeper: &RecordingSleeper::default(),
        },
    )
    .expect("first run");
    let keys = storage.list(&sid()).expect("list");
    assert!(keys.contains(&"left_pinky_fallback.svg".to_string()));
    assert!(keys.contains(&"left_index_preview.png".to_string()));

    let second = measured_oracle();
    let report = run_session(
        &config(),
        &sid(),
        &input(),
        &Services {
            oracle: &second,
            generator: &ScriptedGenerator::new(),
            storage: &storage,
            sleeper: &RecordingSleeper::default(),
        },
    )
    .expect("second run");
    assert_eq!(report.fallback_count(), 0);
    let keys = storage.list(&sid()).expect("list");
    assert_eq!(keys.len(), 13, "{keys:?}");
    assert!(keys.iter().all(|k| !k.ends_with(".svg") && !k.contains("_preview")));
}

#[test]
fn documents_are_written_after_finger_files() {
    let storage = FlakyStorage::default();
    let oracle = scripted_oracle();
    let services = Services {
        oracle: &oracle,
        generator: &ScriptedGenerator::new(),
        storage: &storage,
        sleeper: &RecordingSleeper::default(),
    };
    run_session(&config(), &sid(), &input(), &services).expect("session");
    let order = storage.put_order();
    assert_eq!(
        order[order.len() - 3..],
        ["calibration.json", "measurements.json", "artifacts.json"]
    );

    // A failed re-run leaves no documents describing the previous run.
    storage.fail_on("left_ring.png");
    let err = run_session(&config(), &sid(), &input(), &services).expect_err("storage failure");
    assert!(matches!(err, PipelineError::Storage(StorageError::Io { .. })));
    assert!(get_measurement_set(&storage, &sid()).is_err());
    assert!(get_artifacts(&storage, &sid()).is_err());
    assert!(get_calibration(&storage, &sid()).is_err());
}

#[test]
fn replayed_oracle_drives_a_full_session() {
    let oracle = ReplayOracle::from_json_str(
        r#"{
            "schema": "nailfit.oracle.v1",
            "photos": {
                "card.jpg": {
                    "reference": {"detected": true, "pixel_width": 324, "pixel_height": 204, "confidence": 0.9}
                },
                "left_index.jpg": {
                    "finger": {
                        "nail_width_px": 54, "nail_length_px": 50,
                        "finger_width_px": 70, "finger_length_px": 280,
                        "shape": "almond", "curvature": 0.4, "confidence": 0.85
                    },
                    "nail_region": {"x": 10, "y": 8, "width": 20, "height": 24}
                },
                "right_thumb.jpg": {
                    "finger": {
                        "nailWidthPx": 64, "nailLengthPx": 58,
                        "fingerWidthPx": 84, "fingerLengthPx": 220,
                        "shape": "square", "curvature": 0.6, "score": 0.9
                    }
                },
                "left_pinky.jpg": {}
            }
        }"#,
    )
    .expect("replay file");
    let input = SessionInput {
        reference: blank_photo("card.jpg"),
        fingers: [
            FingerPosition::LeftIndex,
            FingerPosition::RightThumb,
            FingerPosition::LeftPinky,
        ]
        .iter()
        .map(|p| FingerPhoto {
            position: *p,
            photo: blank_photo(&format!("{}.jpg", p.slug())),
        })
        .collect(),
        style: None,
    };
    let storage = MemorySessionStorage::new();
    let services = Services {
        oracle: &oracle,
        generator: &OfflineGenerator,
        storage: &storage,
        sleeper: &RecordingSleeper::default(),
    };
    let report = run_session(&config(), &sid(), &input, &services).expect("session");

    let set = &report.measurements;
    assert_eq!(set.measured_count(), 3);
    let li = set.get(FingerPosition::LeftIndex);
    assert_eq!(li.source_kind(), SourceKind::Measured);
    assert!((li.nail_width_mm() - 54.0 * 85.60 / 324.0).abs() < 1e-9);
    assert_eq!(
        set.get(FingerPosition::LeftThumb).source_kind(),
        SourceKind::InferredFromPair
    );
    assert_eq!(
        set.get(FingerPosition::LeftMiddle).source_kind(),
        SourceKind::InferredFromTemplate
    );
    // No recorded finger response: absorbed as an extraction failure.
    let pinky = set.get(FingerPosition::LeftPinky);
    assert!(pinky.is_zeroed());
    assert_eq!(pinky.confidence(), EXTRACTION_FAILURE_CONFIDENCE);

    assert_eq!(report.fallback_count(), 10);
    for a in &report.artifacts {
        assert_eq!(
            a.preview_ref.is_some(),
            a.position == FingerPosition::LeftIndex,
            "{}",
            a.position
        );
    }
    assert_eq!(get_artifacts(&storage, &sid()).expect("artifacts"), report.artifacts);
}
