//! Oracle backend that serves recorded responses.
//!
//! Replay files follow the `nailfit.oracle.v1` schema: one entry per photo
//! name, each holding the raw JSON the vision service returned for that photo.
//! Responses go through the same validation as live ones.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use super::schema;
use super::{
    FingerObservation, NailRegionLookup, OracleError, Photo, ReferenceDetection, VisionOracle,
};
use crate::finger::FingerPosition;
use crate::measurement::FingerMeasurement;

pub const ORACLE_REPLAY_SCHEMA_V1: &str = "nailfit.oracle.v1";

/// Raw responses recorded for one photo.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhotoRecording {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finger: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nail_region: Option<Value>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplayFileV1 {
    schema: String,
    photos: HashMap<String, PhotoRecording>,
}

/// Vision oracle backed by recorded responses keyed by photo name.
#[derive(Debug, Clone, Default)]
pub struct ReplayOracle {
    photos: HashMap<String, PhotoRecording>,
}

impl ReplayOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a replay file.
    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data).map_err(Into::into)
    }

    pub fn from_json_str(data: &str) -> Result<Self, String> {
        let file: ReplayFileV1 =
            serde_json::from_str(data).map_err(|e| format!("invalid oracle replay file: {e}"))?;
        if file.schema != ORACLE_REPLAY_SCHEMA_V1 {
            return Err(format!(
                "unsupported oracle replay schema '{}' (expected '{}')",
                file.schema, ORACLE_REPLAY_SCHEMA_V1
            ));
        }
        Ok(Self {
            photos: file.photos,
        })
    }

    /// Record (or replace) the responses for `photo_name`.
    pub fn insert(&mut self, photo_name: impl Into<String>, recording: PhotoRecording) {
        self.photos.insert(photo_name.into(), recording);
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    fn recorded<'a>(
        &'a self,
        photo: &Photo,
        pick: impl Fn(&'a PhotoRecording) -> Option<&'a Value>,
    ) -> Result<&'a Value, OracleError> {
        self.photos
            .get(photo.name())
            .and_then(pick)
            .ok_or_else(|| OracleError::NoRecording(photo.name().to_string()))
    }
}

impl VisionOracle for ReplayOracle {
    fn detect_reference_object(&self, photo: &Photo) -> Result<ReferenceDetection, OracleError> {
        schema::parse_reference(self.recorded(photo, |r| r.reference.as_ref())?)
    }

    fn measure_finger(
        &self,
        photo: &Photo,
        _position: FingerPosition,
        _pixels_per_mm: f64,
    ) -> Result<FingerObservation, OracleError> {
        schema::parse_finger(self.recorded(photo, |r| r.finger.as_ref())?)
    }

    fn locate_nail_region(
        &self,
        photo: &Photo,
        _measurement: &FingerMeasurement,
    ) -> Result<NailRegionLookup, OracleError> {
        match self.photos.get(photo.name()) {
            Some(PhotoRecording {
                nail_region: Some(v),
                ..
            }) => schema::parse_nail_region(v),
            _ => Ok(NailRegionLookup::NotFound),
        }
    }
}
