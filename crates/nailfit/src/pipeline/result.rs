//! Session outputs and the persisted documents downstream consumers read.

use crate::artifact::{GeneratedArtifact, Origin};
use crate::calibration::ReferenceCalibration;
use crate::finger::FingerPosition;
use crate::measurement::MeasurementSet;
use crate::session::SessionId;
use crate::storage::{get_json, SessionStorage, StorageError};

pub const MEASUREMENTS_SCHEMA_V1: &str = "nailfit.measurements.v1";
pub const ARTIFACTS_SCHEMA_V1: &str = "nailfit.artifacts.v1";

pub const CALIBRATION_KEY: &str = "calibration.json";
pub const MEASUREMENTS_KEY: &str = "measurements.json";
pub const ARTIFACTS_KEY: &str = "artifacts.json";

/// Everything one session produced.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub calibration: ReferenceCalibration,
    pub measurements: MeasurementSet,
    /// Ten artifacts in canonical finger order.
    pub artifacts: Vec<GeneratedArtifact>,
}

impl SessionReport {
    pub fn generated_count(&self) -> usize {
        self.count_origin(Origin::Generated)
    }

    pub fn fallback_count(&self) -> usize {
        self.count_origin(Origin::Fallback)
    }

    fn count_origin(&self, origin: Origin) -> usize {
        self.artifacts.iter().filter(|a| a.origin == origin).count()
    }
}

/// `measurements.json`: the completed set plus the calibration it used.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct MeasurementsDocument {
    pub schema: String,
    pub session_id: SessionId,
    pub calibration: ReferenceCalibration,
    pub measurements: MeasurementSet,
}

/// `artifacts.json`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ArtifactsDocument {
    pub schema: String,
    pub session_id: SessionId,
    pub artifacts: Vec<GeneratedArtifact>,
}

fn check_schema(key: &str, found: &str, expected: &str) -> Result<(), StorageError> {
    if found == expected {
        return Ok(());
    }
    Err(StorageError::Malformed {
        key: key.to_string(),
        message: format!("unsupported schema '{found}' (expected '{expected}')"),
    })
}

/// Calibration persisted for `session`.
pub fn get_calibration(
    storage: &dyn SessionStorage,
    session: &SessionId,
) -> Result<ReferenceCalibration, StorageError> {
    get_json(storage, session, CALIBRATION_KEY)
}

/// The ten-record measurement set persisted for `session`.
pub fn get_measurement_set(
    storage: &dyn SessionStorage,
    session: &SessionId,
) -> Result<MeasurementSet, StorageError> {
    let doc: MeasurementsDocument = get_json(storage, session, MEASUREMENTS_KEY)?;
    check_schema(MEASUREMENTS_KEY, &doc.schema, MEASUREMENTS_SCHEMA_V1)?;
    Ok(doc.measurements)
}

/// The ten artifacts persisted for `session`, in canonical order.
pub fn get_artifacts(
    storage: &dyn SessionStorage,
    session: &SessionId,
) -> Result<Vec<GeneratedArtifact>, StorageError> {
    let doc: ArtifactsDocument = get_json(storage, session, ARTIFACTS_KEY)?;
    check_schema(ARTIFACTS_KEY, &doc.schema, ARTIFACTS_SCHEMA_V1)?;
    let canonical = doc.artifacts.len() == FingerPosition::COUNT
        && doc
            .artifacts
            .iter()
            .zip(FingerPosition::ALL)
            .all(|(a, p)| a.position == p);
    if !canonical {
        return Err(StorageError::Malformed {
            key: ARTIFACTS_KEY.to_string(),
            message: "expected one artifact per finger in canonical order".to_string(),
        });
    }
    Ok(doc.artifacts)
}
