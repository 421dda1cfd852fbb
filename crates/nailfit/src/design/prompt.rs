//! Prompt composition for the generative image service.
//!
//! Everything here is a pure function of the measurement and the caller's
//! style preferences, so identical inputs always give an identical prompt.

use crate::artifact::Complexity;
use crate::finger::{FingerPosition, ShapeCategory};
use crate::measurement::FingerMeasurement;

/// Nails wider than this are "wide".
pub const WIDE_NAIL_MM: f64 = 15.0;
/// Nails narrower than this are "narrow".
pub const NARROW_NAIL_MM: f64 = 10.0;
/// Nails longer than this are "long".
pub const LONG_NAIL_MM: f64 = 16.0;
/// Nails shorter than this are "short".
pub const SHORT_NAIL_MM: f64 = 12.0;

const HIGH_CURVATURE: f64 = 0.7;
const FLAT_CURVATURE: f64 = 0.3;

/// Caller-supplied style terms.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StylePreferences {
    /// Overall look, e.g. "minimalist" or "glam".
    pub style: String,
    pub colors: Vec<String>,
    /// Optional theme such as "floral" or "ocean".
    pub theme: Option<String>,
    /// Requested level of detail.
    pub complexity: Complexity,
    /// Free-form terms appended verbatim.
    pub extra_terms: Vec<String>,
}

impl Default for StylePreferences {
    fn default() -> Self {
        Self {
            style: "modern".to_string(),
            colors: Vec::new(),
            theme: None,
            complexity: Complexity::Medium,
            extra_terms: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthBand {
    Narrow,
    Medium,
    Wide,
}

impl WidthBand {
    pub fn classify(width_mm: f64) -> Self {
        if width_mm > WIDE_NAIL_MM {
            Self::Wide
        } else if width_mm < NARROW_NAIL_MM {
            Self::Narrow
        } else {
            Self::Medium
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Narrow => "narrow",
            Self::Medium => "medium",
            Self::Wide => "wide",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthBand {
    Short,
    Medium,
    Long,
}

impl LengthBand {
    pub fn classify(length_mm: f64) -> Self {
        if length_mm > LONG_NAIL_MM {
            Self::Long
        } else if length_mm < SHORT_NAIL_MM {
            Self::Short
        } else {
            Self::Medium
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Medium => "medium",
            Self::Long => "long",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurvatureBand {
    Flat,
    Moderate,
    High,
}

impl CurvatureBand {
    pub fn classify(curvature: f64) -> Self {
        if curvature > HIGH_CURVATURE {
            Self::High
        } else if curvature < FLAT_CURVATURE {
            Self::Flat
        } else {
            Self::Moderate
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

/// Fixed wording per nail shape.
pub fn shape_phrase(shape: ShapeCategory) -> &'static str {
    match shape {
        ShapeCategory::Oval => "an oval nail with a softly rounded tip",
        ShapeCategory::Square => "a square nail with a straight tip and sharp corners",
        ShapeCategory::Round => "a short round nail following the fingertip",
        ShapeCategory::Almond => "an almond nail tapering to a narrow rounded tip",
        ShapeCategory::Coffin => "a coffin nail with tapered sides and a flat tip",
    }
}

/// A generation request: the prompt text plus the structured terms it was
/// built from.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PromptDescription {
    pub position: FingerPosition,
    pub text: String,
    pub shape: ShapeCategory,
    pub width_band: WidthBand,
    pub length_band: LengthBand,
    pub curvature_band: CurvatureBand,
    pub nail_width_mm: f64,
    pub nail_length_mm: f64,
}

/// Compose the prompt for one finger.
pub fn build_prompt(measurement: &FingerMeasurement, style: &StylePreferences) -> PromptDescription {
    let width_mm = measurement.nail_width_mm();
    let length_mm = measurement.nail_length_mm();
    let shape = measurement.shape_category();
    let width_band = WidthBand::classify(width_mm);
    let length_band = LengthBand::classify(length_mm);
    let curvature_band = CurvatureBand::classify(measurement.curvature());

    let mut parts = vec![
        format!(
            "Nail art design for the {} nail, {}",
            measurement.position().label(),
            shape_phrase(shape)
        ),
        format!(
            "{} width ({:.1} mm) and {} length ({:.1} mm)",
            width_band.as_str(),
            width_mm,
            length_band.as_str(),
            length_mm
        ),
        format!("{} curvature", curvature_band.as_str()),
    ];

    if !style.style.trim().is_empty() {
        parts.push(format!("{} style", style.style.trim()));
    }
    let colors: Vec<&str> = style
        .colors
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if !colors.is_empty() {
        parts.push(format!("colors: {}", colors.join(", ")));
    }
    if let Some(theme) = style.theme.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        parts.push(format!("{theme} theme"));
    }
    parts.push(format!("{} detail", style.complexity.as_str()));
    parts.extend(
        style
            .extra_terms
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(str::to_string),
    );
    parts.push(
        "flat artwork filling the nail silhouette, transparent background, no hands".to_string(),
    );

    PromptDescription {
        position: measurement.position(),
        text: parts.join("; "),
        shape,
        width_band,
        length_band,
        curvature_band,
        nail_width_mm: width_mm,
        nail_length_mm: length_mm,
    }
}
