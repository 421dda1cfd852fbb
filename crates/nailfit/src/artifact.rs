//! Output records handed to downstream consumers.

use std::fmt;
use std::str::FromStr;

use crate::design::PaletteColor;
use crate::finger::FingerPosition;
use crate::storage::ArtifactRef;

/// Where a design came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Generated,
    Fallback,
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Level of detail of a design.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    #[serde(alias = "minimal")]
    Simple,
    #[default]
    #[serde(alias = "moderate")]
    Medium,
    #[serde(alias = "detailed", alias = "intricate")]
    Complex,
}

impl Complexity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
        }
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" | "minimal" => Ok(Self::Simple),
            "medium" | "moderate" => Ok(Self::Medium),
            "complex" | "detailed" | "intricate" => Ok(Self::Complex),
            other => Err(format!("unknown complexity '{other}'")),
        }
    }
}

/// One finger's fitted design.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeneratedArtifact {
    pub position: FingerPosition,
    /// Print-ready raster at the exact physical size.
    pub image_ref: ArtifactRef,
    pub description: String,
    pub palette_colors: Vec<PaletteColor>,
    pub complexity: Complexity,
    pub origin: Origin,
    pub physical_width_mm: f64,
    pub physical_height_mm: f64,
    /// `[width, height]` of the print raster in pixels.
    pub pixel_size: [u32; 2],
    /// Artwork blended onto the finger photo, when one could be produced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_ref: Option<ArtifactRef>,
    /// SVG source of fallback art.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_ref: Option<ArtifactRef>,
    pub prompt: String,
}
