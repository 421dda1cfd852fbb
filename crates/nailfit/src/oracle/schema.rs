//! Validation of loosely-typed oracle JSON into tagged results.
//!
//! Backends differ in naming (`pixel_width` vs `pixelWidth`), send numbers as
//! strings, and attach arbitrary extra members. Extra members are ignored;
//! required members must be present and finite.

use serde_json::{Map, Value};

use super::{FingerObservation, NailRegion, NailRegionLookup, OracleError, ReferenceDetection};
use crate::finger::ShapeCategory;

fn as_object(value: &Value) -> Result<&Map<String, Value>, OracleError> {
    value
        .as_object()
        .ok_or_else(|| OracleError::Malformed(format!("expected a JSON object, got {value}")))
}

fn lookup<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .find_map(|n| obj.get(*n))
        .filter(|v| !v.is_null())
}

fn number(
    obj: &Map<String, Value>,
    field: &'static str,
    aliases: &[&str],
) -> Result<Option<f64>, OracleError> {
    let Some(raw) = lookup(obj, aliases) else {
        return Ok(None);
    };
    let v = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| OracleError::InvalidField {
        field,
        reason: format!("expected a number, got {raw}"),
    })?;
    if !v.is_finite() {
        return Err(OracleError::InvalidField {
            field,
            reason: "value is not finite".to_string(),
        });
    }
    Ok(Some(v))
}

fn required_number(
    obj: &Map<String, Value>,
    field: &'static str,
    aliases: &[&str],
) -> Result<f64, OracleError> {
    number(obj, field, aliases)?.ok_or(OracleError::MissingField(field))
}

fn non_negative(field: &'static str, v: f64) -> Result<f64, OracleError> {
    if v < 0.0 {
        return Err(OracleError::InvalidField {
            field,
            reason: format!("must be >= 0 (got {v})"),
        });
    }
    Ok(v)
}

fn boolean(obj: &Map<String, Value>, aliases: &[&str]) -> Option<bool> {
    match lookup(obj, aliases)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|v| v != 0.0),
        _ => None,
    }
}

/// Parse a `detectReferenceObject` response.
///
/// The pixel width is passed through even when non-positive; rejecting it is
/// the calibrator's job.
pub(crate) fn parse_reference(value: &Value) -> Result<ReferenceDetection, OracleError> {
    let obj = as_object(value)?;
    let detected = boolean(obj, &["detected", "found"]).ok_or(OracleError::MissingField("detected"))?;
    if !detected {
        return Ok(ReferenceDetection::NotDetected);
    }
    let pixel_width = required_number(obj, "pixel_width", &["pixel_width", "pixelWidth", "width"])?;
    let pixel_height =
        required_number(obj, "pixel_height", &["pixel_height", "pixelHeight", "height"])?;
    let confidence = required_number(obj, "confidence", &["confidence", "score"])?;
    Ok(ReferenceDetection::Detected {
        pixel_width,
        pixel_height,
        confidence: confidence.clamp(0.0, 1.0),
    })
}

/// Parse a `measureFinger` response. Every member is required.
pub(crate) fn parse_finger(value: &Value) -> Result<FingerObservation, OracleError> {
    let obj = as_object(value)?;
    let px = |field: &'static str, aliases: &[&str]| -> Result<f64, OracleError> {
        non_negative(field, required_number(obj, field, aliases)?)
    };
    let nail_width_px = px("nail_width_px", &["nail_width_px", "nailWidthPx"])?;
    let nail_length_px = px("nail_length_px", &["nail_length_px", "nailLengthPx"])?;
    let finger_width_px = px("finger_width_px", &["finger_width_px", "fingerWidthPx"])?;
    let finger_length_px = px("finger_length_px", &["finger_length_px", "fingerLengthPx"])?;

    let shape = match lookup(obj, &["shape_category", "shapeCategory", "shape"]) {
        Some(Value::String(s)) => s
            .parse::<ShapeCategory>()
            .map_err(|reason| OracleError::InvalidField {
                field: "shape_category",
                reason,
            })?,
        Some(other) => {
            return Err(OracleError::InvalidField {
                field: "shape_category",
                reason: format!("expected a string, got {other}"),
            })
        }
        None => return Err(OracleError::MissingField("shape_category")),
    };

    let curvature = required_number(obj, "curvature", &["curvature"])?.clamp(0.0, 1.0);
    let confidence = required_number(obj, "confidence", &["confidence", "score"])?.clamp(0.0, 1.0);

    Ok(FingerObservation {
        nail_width_px,
        nail_length_px,
        finger_width_px,
        finger_length_px,
        shape,
        curvature,
        confidence,
    })
}

/// Parse a `locateNailRegion` response. `null` and `{"found": false}` mean
/// the nail was not located; a box may sit at the top level or under `region`.
pub(crate) fn parse_nail_region(value: &Value) -> Result<NailRegionLookup, OracleError> {
    if value.is_null() {
        return Ok(NailRegionLookup::NotFound);
    }
    let obj = as_object(value)?;
    if boolean(obj, &["found", "detected"]) == Some(false) {
        return Ok(NailRegionLookup::NotFound);
    }
    let boxed = match obj.get("region") {
        Some(Value::Null) => return Ok(NailRegionLookup::NotFound),
        Some(inner) => as_object(inner)?,
        None => obj,
    };
    let coord = |field: &'static str| -> Result<u32, OracleError> {
        let v = non_negative(field, required_number(boxed, field, &[field])?)?;
        if v > u32::MAX as f64 {
            return Err(OracleError::InvalidField {
                field,
                reason: "value out of range".to_string(),
            });
        }
        Ok(v.round() as u32)
    };
    Ok(NailRegionLookup::Found(NailRegion {
        x: coord("x")?,
        y: coord("y")?,
        width: coord("width")?,
        height: coord("height")?,
    }))
}
