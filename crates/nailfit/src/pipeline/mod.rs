//! Session pipeline.
//!
//! Stage order: calibrate -> extract (per captured finger) -> complete to ten
//! records -> design (generate or fall back) -> fit and composite -> persist.
//!
//! Only a failed calibration (or a storage failure) ends a session early; it
//! does so before anything is written. Every later stage absorbs per-finger
//! failures into confidence, source kind, origin and recommendations.

mod result;
mod run;
#[cfg(test)]
mod tests;

use thiserror::Error;

use crate::calibration::CalibrationFailure;
use crate::storage::StorageError;

pub use result::{
    get_artifacts, get_calibration, get_measurement_set, SessionReport, ARTIFACTS_KEY,
    ARTIFACTS_SCHEMA_V1, CALIBRATION_KEY, MEASUREMENTS_KEY, MEASUREMENTS_SCHEMA_V1,
};
pub use run::{FingerPhoto, Services, SessionInput};

pub(crate) use run::run_session;

/// Session-level failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Calibration(#[from] CalibrationFailure),
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),
}
