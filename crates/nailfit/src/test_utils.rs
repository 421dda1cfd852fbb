//! Shared test doubles for pipeline unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::Mutex;
use std::time::Duration;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::design::{GenerationError, ImageGenerator, PromptDescription, Sleeper};
use crate::finger::{FingerPosition, ShapeCategory};
use crate::measurement::FingerMeasurement;
use crate::oracle::{
    FingerObservation, NailRegion, NailRegionLookup, OracleError, Photo, ReferenceDetection,
    VisionOracle,
};
use crate::session::SessionId;
use crate::storage::{ArtifactRef, MemorySessionStorage, SessionStorage, StorageError};

/// Small uniform photo.
pub(crate) fn blank_photo(name: &str) -> Photo {
    Photo::new(name, solid_image(64, 48, [200, 170, 150, 255]))
}

pub(crate) fn solid_image(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba(rgba))
}

pub(crate) fn png_bytes(img: &RgbaImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("encode test png");
    buf.into_inner()
}

pub(crate) fn observation(
    nail_width_px: f64,
    nail_length_px: f64,
    finger_width_px: f64,
    finger_length_px: f64,
    confidence: f64,
) -> FingerObservation {
    FingerObservation {
        nail_width_px,
        nail_length_px,
        finger_width_px,
        finger_length_px,
        shape: ShapeCategory::Oval,
        curvature: 0.5,
        confidence,
    }
}

/// Oracle answering from per-position scripts.
///
/// Unscripted reference detection and finger measurement return a backend
/// error; unscripted nail regions are not found.
#[derive(Default)]
pub(crate) struct ScriptedOracle {
    reference: Option<ReferenceDetection>,
    fingers: HashMap<FingerPosition, Result<FingerObservation, OracleError>>,
    regions: HashMap<FingerPosition, NailRegionLookup>,
    pub(crate) finger_calls: RefCell<Vec<FingerPosition>>,
}

impl ScriptedOracle {
    pub(crate) fn with_reference(mut self, detection: ReferenceDetection) -> Self {
        self.reference = Some(detection);
        self
    }

    pub(crate) fn with_finger(
        mut self,
        position: FingerPosition,
        result: Result<FingerObservation, OracleError>,
    ) -> Self {
        self.fingers.insert(position, result);
        self
    }

    pub(crate) fn with_nail_region(mut self, position: FingerPosition, region: NailRegion) -> Self {
        self.regions
            .insert(position, NailRegionLookup::Found(region));
        self
    }
}

impl VisionOracle for ScriptedOracle {
    fn detect_reference_object(&self, _photo: &Photo) -> Result<ReferenceDetection, OracleError> {
        self.reference
            .ok_or_else(|| OracleError::Backend("reference not scripted".to_string()))
    }

    fn measure_finger(
        &self,
        _photo: &Photo,
        position: FingerPosition,
        _pixels_per_mm: f64,
    ) -> Result<FingerObservation, OracleError> {
        self.finger_calls.borrow_mut().push(position);
        self.fingers
            .get(&position)
            .cloned()
            .unwrap_or_else(|| Err(OracleError::Backend(format!("{position} not scripted"))))
    }

    fn locate_nail_region(
        &self,
        _photo: &Photo,
        measurement: &FingerMeasurement,
    ) -> Result<NailRegionLookup, OracleError> {
        Ok(self
            .regions
            .get(&measurement.position())
            .copied()
            .unwrap_or(NailRegionLookup::NotFound))
    }
}

/// How a scripted generator fails for a position.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ScriptedFailure {
    Transport,
    Quota,
    Garbage,
}

/// Generator returning a small PNG, failing for selected finger indices.
pub(crate) struct ScriptedGenerator {
    failures: HashMap<usize, ScriptedFailure>,
    image: RgbaImage,
    pub(crate) calls: RefCell<Vec<FingerPosition>>,
}

impl ScriptedGenerator {
    pub(crate) fn new() -> Self {
        Self {
            failures: HashMap::new(),
            image: solid_image(32, 48, [40, 90, 200, 255]),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Fail with a transport error at each canonical finger index in `indices`.
    pub(crate) fn failing_at(indices: &[usize]) -> Self {
        let mut g = Self::new();
        for idx in indices {
            g.failures.insert(*idx, ScriptedFailure::Transport);
        }
        g
    }

    pub(crate) fn with_failure(mut self, index: usize, failure: ScriptedFailure) -> Self {
        self.failures.insert(index, failure);
        self
    }

    pub(crate) fn failed_indices(&self) -> HashSet<usize> {
        self.failures.keys().copied().collect()
    }
}

impl ImageGenerator for ScriptedGenerator {
    fn generate(&self, prompt: &PromptDescription) -> Result<Vec<u8>, GenerationError> {
        self.calls.borrow_mut().push(prompt.position);
        match self.failures.get(&prompt.position.index()) {
            Some(ScriptedFailure::Transport) => {
                Err(GenerationError::Transport("connection reset".to_string()))
            }
            Some(ScriptedFailure::Quota) => Err(GenerationError::Quota),
            Some(ScriptedFailure::Garbage) => Ok(b"not an image".to_vec()),
            None => Ok(png_bytes(&self.image)),
        }
    }
}

/// Sleeper that records requested delays instead of waiting.
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    pub(crate) delays: RefCell<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.borrow_mut().push(duration);
    }
}

/// In-memory storage that records the order of writes and can be told to
/// fail on one key.
#[derive(Default)]
pub(crate) struct FlakyStorage {
    inner: MemorySessionStorage,
    fail_key: Mutex<Option<String>>,
    pub(crate) puts: Mutex<Vec<String>>,
}

impl FlakyStorage {
    pub(crate) fn fail_on(&self, key: &str) {
        *self.fail_key.lock().expect("fail_key lock") = Some(key.to_string());
    }

    pub(crate) fn put_order(&self) -> Vec<String> {
        self.puts.lock().expect("puts lock").clone()
    }
}

impl SessionStorage for FlakyStorage {
    fn put(
        &self,
        session: &SessionId,
        key: &str,
        bytes: &[u8],
    ) -> Result<ArtifactRef, StorageError> {
        if self.fail_key.lock().expect("fail_key lock").as_deref() == Some(key) {
            return Err(StorageError::Io {
                path: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.puts.lock().expect("puts lock").push(key.to_string());
        self.inner.put(session, key, bytes)
    }

    fn get(&self, session: &SessionId, key: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.get(session, key)
    }

    fn list(&self, session: &SessionId) -> Result<Vec<String>, StorageError> {
        self.inner.list(session)
    }

    fn remove(&self, session: &SessionId, key: &str) -> Result<(), StorageError> {
        self.inner.remove(session, key)
    }
}
