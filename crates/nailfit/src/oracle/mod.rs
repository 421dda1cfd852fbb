//! Boundary to the external vision backend.
//!
//! The pipeline never measures pixels itself: it asks a [`VisionOracle`] for
//! reference-object detection, finger measurements and nail regions, and
//! validates whatever comes back. Loosely-typed JSON responses are parsed into
//! the tagged types in this module by [`schema`], so callers never branch on
//! ad hoc field presence.

mod replay;
pub(crate) mod schema;

use std::path::Path;

use image::RgbaImage;
use thiserror::Error;

use crate::finger::{FingerPosition, ShapeCategory};
use crate::measurement::FingerMeasurement;

pub use replay::{PhotoRecording, ReplayOracle, ORACLE_REPLAY_SCHEMA_V1};

#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("oracle backend failed: {0}")]
    Backend(String),
    #[error("oracle response is missing field '{0}'")]
    MissingField(&'static str),
    #[error("oracle response field '{field}' is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("oracle response is malformed: {0}")]
    Malformed(String),
    #[error("no recorded oracle response for photo '{0}'")]
    NoRecording(String),
}

/// A decoded photo plus the name it was uploaded under.
#[derive(Debug, Clone)]
pub struct Photo {
    name: String,
    image: RgbaImage,
}

impl Photo {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    /// Decode an image file; the photo is named after the file name.
    pub fn open(path: &Path) -> Result<Self, image::ImageError> {
        let image = image::ImageReader::open(path)?.decode()?.to_rgba8();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, image })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// Result of looking for the reference card in a photo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceDetection {
    Detected {
        /// Bounding width of the reference object in pixels.
        pixel_width: f64,
        /// Bounding height of the reference object in pixels.
        pixel_height: f64,
        /// Detection confidence in `[0, 1]`.
        confidence: f64,
    },
    NotDetected,
}

/// Validated pixel-space measurement of one finger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerObservation {
    pub nail_width_px: f64,
    pub nail_length_px: f64,
    pub finger_width_px: f64,
    pub finger_length_px: f64,
    pub shape: ShapeCategory,
    /// Curvature in `[0, 1]`.
    pub curvature: f64,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Axis-aligned nail bounding box in photo pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct NailRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl NailRegion {
    /// `true` when the box is non-empty and lies fully inside a `w`×`h` image.
    pub fn fits_within(&self, w: u32, h: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= w)
            && self.y.checked_add(self.height).is_some_and(|b| b <= h)
    }
}

/// Result of locating the nail inside a finger photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NailRegionLookup {
    Found(NailRegion),
    NotFound,
}

/// External vision capability consumed by the pipeline.
///
/// Any conforming backend may be plugged in. Implementations should return
/// [`OracleError`] for transport or schema problems; the pipeline decides how
/// each failure degrades.
pub trait VisionOracle {
    /// Locate the reference object and report its pixel bounding size.
    fn detect_reference_object(&self, photo: &Photo) -> Result<ReferenceDetection, OracleError>;

    /// Measure the nail and finger of `position` in pixel units.
    fn measure_finger(
        &self,
        photo: &Photo,
        position: FingerPosition,
        pixels_per_mm: f64,
    ) -> Result<FingerObservation, OracleError>;

    /// Find the nail's bounding box inside `photo`.
    fn locate_nail_region(
        &self,
        photo: &Photo,
        measurement: &FingerMeasurement,
    ) -> Result<NailRegionLookup, OracleError>;
}
