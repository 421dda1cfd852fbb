//! nailfit: card-calibrated nail measurement and design fitting.
//!
//! A session takes one photo of a reference object of known size (an ID-1
//! card by default) and up to ten finger photos, and produces for every
//! finger a millimeter-accurate measurement record and a design raster sized
//! to print on that nail. The stages are:
//!
//! 1. **Calibrate** – pixel scale from the reference object's width.
//! 2. **Extract** – per-finger pixel measurements from the vision oracle,
//!    converted to millimeters.
//! 3. **Complete** – fill the fingers that were not captured from the
//!    mirrored finger or from anatomical templates.
//! 4. **Design** – prompt the generative service, one finger at a time, and
//!    fall back to deterministic vector art when it fails.
//! 5. **Fit** – resize to `mm × dpi / 25.4` pixels and blend a preview onto
//!    the finger photo.
//!
//! # Public API
//! - [`NailFitter`] as the primary entry point
//! - [`PipelineConfig`] for tuning
//! - the [`VisionOracle`], [`ImageGenerator`] and [`SessionStorage`] seams
//! - measurement and artifact records, and readers for persisted sessions

mod api;
mod artifact;
mod calibration;
mod compositor;
mod config;
pub mod design;
mod finger;
mod measurement;
mod oracle;
mod pipeline;
mod session;
mod storage;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::NailFitter;
pub use artifact::{Complexity, GeneratedArtifact, Origin};
pub use calibration::{
    calibrate, CalibrationFailure, CalibrationFailureReason, ReferenceCalibration,
    ReferenceObjectSpec, DEFAULT_MIN_REFERENCE_PIXEL_WIDTH, ID1_CARD_HEIGHT_MM, ID1_CARD_WIDTH_MM,
};
pub use compositor::{
    composite, fit_to_size, mm_to_print_px, overlay_blend, target_pixel_size, CompositeOutput,
    CompositorConfig, FitMode, DEFAULT_PRINT_DPI, MAX_PRINT_PX, MM_PER_INCH,
};
pub use config::{ConfigError, PipelineConfig};
pub use design::{
    build_prompt, generate_designs, synthesize_fallback, FallbackArt, GenerationError,
    GenerationServiceConfig, HttpImageGenerator, ImageGenerator, OfflineGenerator,
    PromptDescription, RateLimitPolicy, Sleeper, StylePreferences, ThreadSleeper,
};
pub use finger::{FingerName, FingerPosition, Hand, ShapeCategory, SourceKind};
pub use measurement::{
    complete_measurements, extract_finger, template_for, FingerMeasurement, FingerTemplate,
    MeasurementSet, PixelMeasurements, DEFAULT_PIXELS_PER_MM, EXTRACTION_FAILURE_CONFIDENCE,
    MAX_FINGER_MM, MAX_NAIL_MM, PAIR_CONFIDENCE_FACTOR, TEMPLATE_CONFIDENCE, TEMPLATE_CURVATURE,
};
pub use oracle::{
    FingerObservation, NailRegion, NailRegionLookup, OracleError, Photo, PhotoRecording,
    ReferenceDetection, ReplayOracle, VisionOracle, ORACLE_REPLAY_SCHEMA_V1,
};
pub use pipeline::{
    get_artifacts, get_calibration, get_measurement_set, FingerPhoto, PipelineError, Services,
    SessionInput, SessionReport, ARTIFACTS_KEY, ARTIFACTS_SCHEMA_V1, CALIBRATION_KEY,
    MEASUREMENTS_KEY, MEASUREMENTS_SCHEMA_V1,
};
pub use session::SessionId;
pub use storage::{
    ArtifactRef, FsSessionStorage, MemorySessionStorage, SessionStorage, StorageError,
};
