//! Deterministic fallback art.
//!
//! Used whenever the generative service fails for a finger. The design is a
//! nail silhouette sized from the measurement, filled with an index-keyed
//! palette and pattern, with a highlight and a physical-size label. Output is
//! a function of (measurement, finger index) only: the SVG text and the raster
//! are identical for equal inputs.

mod raster;
mod svg;

use image::RgbaImage;

use crate::artifact::Complexity;
use crate::finger::ShapeCategory;
use crate::measurement::{FingerMeasurement, MAX_NAIL_MM};

use super::palette::{palette_for_index, pattern_for_index, FallbackPattern, Palette};

/// Raster resolution of fallback art.
pub const FALLBACK_PX_PER_MM: f64 = 10.0;
/// Smallest silhouette extent; zeroed measurements render at this size.
pub const MIN_SILHOUETTE_MM: f64 = 1.0;
/// Largest silhouette extent; bigger measurements are drawn at this size.
pub const MAX_SILHOUETTE_MM: f64 = MAX_NAIL_MM;

/// Highlight center offset toward the top-left, as a fraction of each radius.
const HIGHLIGHT_OFFSET: [f64; 2] = [0.30, 0.35];
/// Highlight radii as a fraction of the silhouette radii.
const HIGHLIGHT_SCALE: [f64; 2] = [0.22, 0.16];
const HIGHLIGHT_OPACITY: f64 = 0.45;
/// Share of the silhouette height taken by the french tip band.
const FRENCH_TIP_FRACTION: f64 = 0.25;
const STRIPE_COUNT: usize = 8;

/// Ellipse in canvas millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EllipseMm {
    pub cx: f64,
    pub cy: f64,
    pub rx: f64,
    pub ry: f64,
}

impl EllipseMm {
    pub(crate) fn contains(&self, x: f64, y: f64) -> bool {
        let dx = (x - self.cx) / self.rx;
        let dy = (y - self.cy) / self.ry;
        dx * dx + dy * dy <= 1.0
    }

    pub(crate) fn top(&self) -> f64 {
        self.cy - self.ry
    }

    pub(crate) fn height(&self) -> f64 {
        2.0 * self.ry
    }
}

/// Resolved drawing parameters shared by the SVG and raster renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Layout {
    pub canvas_w_mm: f64,
    pub canvas_h_mm: f64,
    pub silhouette: EllipseMm,
    pub highlight: EllipseMm,
    pub palette: Palette,
    pub pattern: FallbackPattern,
    /// Dot grid pitch for [`FallbackPattern::Dots`].
    pub dot_pitch_mm: f64,
}

impl Layout {
    pub(crate) fn new(
        width_mm: f64,
        length_mm: f64,
        shape: ShapeCategory,
        curvature: f64,
        index: usize,
    ) -> Self {
        let w = silhouette_extent_mm(width_mm);
        let l = silhouette_extent_mm(length_mm);
        let (rx, ry) = match shape {
            ShapeCategory::Round => {
                let r = w.min(l) / 2.0;
                (r, r)
            }
            _ => (w / 2.0, l * (0.75 + 0.25 * curvature.clamp(0.0, 1.0)) / 2.0),
        };
        let silhouette = EllipseMm {
            cx: w / 2.0,
            cy: l / 2.0,
            rx,
            ry,
        };
        let highlight = EllipseMm {
            cx: silhouette.cx - HIGHLIGHT_OFFSET[0] * rx,
            cy: silhouette.cy - HIGHLIGHT_OFFSET[1] * ry,
            rx: HIGHLIGHT_SCALE[0] * rx,
            ry: HIGHLIGHT_SCALE[1] * ry,
        };
        Self {
            canvas_w_mm: w,
            canvas_h_mm: l,
            silhouette,
            highlight,
            palette: palette_for_index(index),
            pattern: pattern_for_index(index),
            dot_pitch_mm: (rx.min(ry) * 0.5).max(0.5),
        }
    }

    /// Canvas size of the raster rendering.
    pub(crate) fn raster_size(&self) -> (u32, u32) {
        (mm_to_raster_px(self.canvas_w_mm), mm_to_raster_px(self.canvas_h_mm))
    }

    /// Pattern color (before highlight) at canvas point `(x, y)`.
    pub(crate) fn pattern_rgb(&self, x: f64, y: f64) -> [f64; 3] {
        let p = &self.palette;
        let t = ((y - self.silhouette.top()) / self.silhouette.height()).clamp(0.0, 1.0);
        match self.pattern {
            FallbackPattern::Solid => rgb_f(p.base.0),
            FallbackPattern::Gradient => lerp_rgb(rgb_f(p.base.0), rgb_f(p.accent.0), t),
            FallbackPattern::FrenchTip => {
                if t < FRENCH_TIP_FRACTION {
                    rgb_f(p.highlight.0)
                } else {
                    rgb_f(p.base.0)
                }
            }
            FallbackPattern::Stripes => {
                let band = ((t * STRIPE_COUNT as f64) as usize).min(STRIPE_COUNT - 1);
                if band % 2 == 1 {
                    rgb_f(p.accent.0)
                } else {
                    rgb_f(p.base.0)
                }
            }
            FallbackPattern::Dots => {
                let s = self.dot_pitch_mm;
                let gx = self.silhouette.cx + ((x - self.silhouette.cx) / s).round() * s;
                let gy = self.silhouette.cy + ((y - self.silhouette.cy) / s).round() * s;
                let (dx, dy) = (x - gx, y - gy);
                if (dx * dx + dy * dy).sqrt() <= self.dot_radius_mm() {
                    rgb_f(p.accent.0)
                } else {
                    rgb_f(p.base.0)
                }
            }
        }
    }

    pub(crate) fn dot_radius_mm(&self) -> f64 {
        self.dot_pitch_mm * 0.3
    }

    /// Dot grid offsets (in pitch units) covering the silhouette.
    pub(crate) fn dot_grid_extent(&self) -> (i64, i64) {
        let s = self.dot_pitch_mm;
        (
            (self.silhouette.rx / s).ceil() as i64,
            (self.silhouette.ry / s).ceil() as i64,
        )
    }
}

fn silhouette_extent_mm(mm: f64) -> f64 {
    if mm.is_nan() {
        MIN_SILHOUETTE_MM
    } else {
        mm.clamp(MIN_SILHOUETTE_MM, MAX_SILHOUETTE_MM)
    }
}

fn mm_to_raster_px(mm: f64) -> u32 {
    (mm.min(MAX_SILHOUETTE_MM) * FALLBACK_PX_PER_MM)
        .round()
        .max(1.0) as u32
}

fn rgb_f(c: [u8; 3]) -> [f64; 3] {
    [c[0] as f64, c[1] as f64, c[2] as f64]
}

fn lerp_rgb(a: [f64; 3], b: [f64; 3], t: f64) -> [f64; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Level of detail implied by a pattern.
pub fn pattern_complexity(pattern: FallbackPattern) -> Complexity {
    match pattern {
        FallbackPattern::Solid => Complexity::Simple,
        FallbackPattern::Gradient | FallbackPattern::FrenchTip => Complexity::Medium,
        FallbackPattern::Stripes | FallbackPattern::Dots => Complexity::Complex,
    }
}

/// A synthesized fallback design.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackArt {
    pub palette: Palette,
    pub pattern: FallbackPattern,
    pub complexity: Complexity,
    pub description: String,
    /// Size label drawn on the design.
    pub label: String,
    /// Standalone SVG document in millimeter units.
    pub svg: String,
    /// Raster rendering at [`FALLBACK_PX_PER_MM`].
    pub raster: RgbaImage,
}

/// Render the fallback design for `measurement` at canonical `finger_index`.
pub fn synthesize_fallback(measurement: &FingerMeasurement, finger_index: usize) -> FallbackArt {
    let width_mm = measurement.nail_width_mm();
    let length_mm = measurement.nail_length_mm();
    let layout = Layout::new(
        width_mm,
        length_mm,
        measurement.shape_category(),
        measurement.curvature(),
        finger_index,
    );
    let label = size_label(width_mm, length_mm);
    let svg = svg::render(&layout, &label);
    let raster = raster::render(&layout);
    let description = format!(
        "{} {} design for the {} nail ({})",
        layout.palette.name,
        layout.pattern.as_str(),
        measurement.position().label(),
        label
    );
    tracing::debug!(
        position = %measurement.position(),
        palette = layout.palette.name,
        pattern = layout.pattern.as_str(),
        "fallback design synthesized"
    );
    FallbackArt {
        palette: layout.palette,
        pattern: layout.pattern,
        complexity: pattern_complexity(layout.pattern),
        description,
        label,
        svg,
        raster,
    }
}

/// Physical-size label, e.g. `"12.5 × 13.0 mm"`.
pub fn size_label(width_mm: f64, length_mm: f64) -> String {
    format!("{width_mm:.1} × {length_mm:.1} mm")
}
