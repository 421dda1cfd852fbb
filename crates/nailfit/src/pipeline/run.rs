//! Top-level session orchestrator.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use super::result::{
    ArtifactsDocument, MeasurementsDocument, SessionReport, ARTIFACTS_KEY, ARTIFACTS_SCHEMA_V1,
    CALIBRATION_KEY, MEASUREMENTS_KEY, MEASUREMENTS_SCHEMA_V1,
};
use super::PipelineError;
use crate::artifact::GeneratedArtifact;
use crate::calibration::calibrate;
use crate::compositor::composite;
use crate::config::PipelineConfig;
use crate::design::{generate_designs, FingerDesign, ImageGenerator, Sleeper, StylePreferences};
use crate::finger::FingerPosition;
use crate::measurement::{complete_measurements, extract_finger, FingerMeasurement};
use crate::oracle::{Photo, VisionOracle};
use crate::session::SessionId;
use crate::storage::{clear_session, put_json, ArtifactRef, SessionStorage, StorageError};

/// A captured photo of one finger.
#[derive(Debug, Clone)]
pub struct FingerPhoto {
    pub position: FingerPosition,
    pub photo: Photo,
}

/// Photos and preferences for one session.
#[derive(Debug, Clone)]
pub struct SessionInput {
    /// Photo showing the reference object.
    pub reference: Photo,
    /// Zero to ten finger photos; the first photo of a position wins.
    pub fingers: Vec<FingerPhoto>,
    /// Overrides the configured default style.
    pub style: Option<StylePreferences>,
}

/// External collaborators of a session.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub oracle: &'a dyn VisionOracle,
    pub generator: &'a dyn ImageGenerator,
    pub storage: &'a dyn SessionStorage,
    pub sleeper: &'a dyn Sleeper,
}

pub(crate) fn run_session(
    config: &PipelineConfig,
    session: &SessionId,
    input: &SessionInput,
    services: &Services<'_>,
) -> Result<SessionReport, PipelineError> {
    tracing::info!(session = %session, fingers = input.fingers.len(), "session started");

    let calibration = calibrate(services.oracle, &input.reference, &config.reference);
    calibration.require_detected(input.reference.name())?;

    let measured: Vec<FingerMeasurement> = input
        .fingers
        .iter()
        .map(|f| extract_finger(services.oracle, &f.photo, f.position, &calibration))
        .collect();
    let measurements = complete_measurements(&measured, Some(&calibration));

    // A re-run replaces the previous output as a whole.
    let storage = services.storage;
    let removed = clear_session(storage, session)?;
    if removed > 0 {
        tracing::debug!(session = %session, removed, "previous session output cleared");
    }

    let style = input.style.as_ref().unwrap_or(&config.style);
    let designs = generate_designs(
        &measurements,
        style,
        services.generator,
        &config.rate_limit,
        services.sleeper,
    );

    let mut artifacts = Vec::with_capacity(designs.len());
    for design in &designs {
        let position = design.measurement.position();
        let source = input
            .fingers
            .iter()
            .find(|f| f.position == position)
            .map(|f| &f.photo);
        artifacts.push(fit_and_store(config, session, design, source, services)?);
    }

    // Documents go last so they only ever describe files already written.
    put_json(storage, session, CALIBRATION_KEY, &calibration)?;
    put_json(
        storage,
        session,
        MEASUREMENTS_KEY,
        &MeasurementsDocument {
            schema: MEASUREMENTS_SCHEMA_V1.to_string(),
            session_id: session.clone(),
            calibration: calibration.clone(),
            measurements: measurements.clone(),
        },
    )?;
    put_json(
        storage,
        session,
        ARTIFACTS_KEY,
        &ArtifactsDocument {
            schema: ARTIFACTS_SCHEMA_V1.to_string(),
            session_id: session.clone(),
            artifacts: artifacts.clone(),
        },
    )?;

    let report = SessionReport {
        session_id: session.clone(),
        calibration,
        measurements,
        artifacts,
    };
    tracing::info!(
        session = %session,
        overall_confidence = report.measurements.overall_confidence(),
        generated = report.generated_count(),
        fallback = report.fallback_count(),
        "session complete"
    );
    Ok(report)
}

fn fit_and_store(
    config: &PipelineConfig,
    session: &SessionId,
    design: &FingerDesign,
    source: Option<&Photo>,
    services: &Services<'_>,
) -> Result<GeneratedArtifact, StorageError> {
    let m = &design.measurement;
    let slug = m.position().slug();
    let out = composite(design.image(), m, source, services.oracle, &config.compositor);

    let image_ref = put_png(services.storage, session, &format!("{slug}.png"), &out.print)?;
    let preview_ref = match &out.preview {
        Some(preview) => Some(put_png(
            services.storage,
            session,
            &format!("{slug}_preview.png"),
            preview,
        )?),
        None => None,
    };
    let vector_ref = match design.svg() {
        Some(svg) => Some(services.storage.put(
            session,
            &format!("{slug}_fallback.svg"),
            svg.as_bytes(),
        )?),
        None => None,
    };

    Ok(GeneratedArtifact {
        position: m.position(),
        image_ref,
        description: design.description.clone(),
        palette_colors: design.palette_colors.clone(),
        complexity: design.complexity,
        origin: design.origin(),
        physical_width_mm: m.nail_width_mm(),
        physical_height_mm: m.nail_length_mm(),
        pixel_size: [out.print.width(), out.print.height()],
        preview_ref,
        vector_ref,
        prompt: design.prompt.text.clone(),
    })
}

fn put_png(
    storage: &dyn SessionStorage,
    session: &SessionId,
    key: &str,
    img: &RgbaImage,
) -> Result<ArtifactRef, StorageError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| StorageError::Malformed {
            key: key.to_string(),
            message: e.to_string(),
        })?;
    storage.put(session, key, buf.get_ref())
}
