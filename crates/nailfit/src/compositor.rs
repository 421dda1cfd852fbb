//! Physically-exact print sizing and the optional on-photo preview.
//!
//! Print rasters are sized `round(mm × dpi / 25.4)` on each axis: nail width
//! maps to image width and nail length to image height. Every fit mode yields
//! exactly that size. Both axes are capped at
//! [`CompositorConfig::max_nail_mm`] and [`MAX_PRINT_PX`].

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::measurement::{FingerMeasurement, MAX_NAIL_MM};
use crate::oracle::{NailRegionLookup, Photo, VisionOracle};

pub const MM_PER_INCH: f64 = 25.4;
pub const DEFAULT_PRINT_DPI: f64 = 300.0;
/// Hard per-axis limit on any print raster.
pub const MAX_PRINT_PX: u32 = 8192;

/// How artwork is mapped onto the target raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Scale each axis independently to the exact target.
    #[default]
    Stretch,
    /// Preserve aspect ratio; pad with transparency.
    Contain,
    /// Preserve aspect ratio; crop the centered overflow.
    Cover,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Print resolution in dots per inch.
    pub dpi: f64,
    pub fit_mode: FitMode,
    /// Overlay strength on the preview, in `[0, 1]`.
    pub overlay_opacity: f64,
    /// Blend artwork onto the finger photo when a nail region is found.
    pub preview: bool,
    /// Per-axis print size limit in millimeters.
    pub max_nail_mm: f64,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_PRINT_DPI,
            fit_mode: FitMode::Stretch,
            overlay_opacity: 0.85,
            preview: true,
            max_nail_mm: MAX_NAIL_MM,
        }
    }
}

impl CompositorConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if !self.dpi.is_finite() || self.dpi <= 0.0 {
            return Err("compositor.dpi must be finite and > 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.overlay_opacity) {
            return Err("compositor.overlay_opacity must be in [0, 1]".to_string());
        }
        if !self.max_nail_mm.is_finite() || self.max_nail_mm <= 0.0 {
            return Err("compositor.max_nail_mm must be finite and > 0".to_string());
        }
        Ok(())
    }
}

/// Pixel count for `mm` at `dpi`, within `[1, MAX_PRINT_PX]`.
pub fn mm_to_print_px(mm: f64, dpi: f64) -> u32 {
    let px = (mm * dpi / MM_PER_INCH).round();
    if px.is_nan() || px < 1.0 {
        1
    } else if px >= MAX_PRINT_PX as f64 {
        MAX_PRINT_PX
    } else {
        px as u32
    }
}

/// `[width, height]` of the print raster for a nail.
pub fn target_pixel_size(width_mm: f64, height_mm: f64, dpi: f64) -> [u32; 2] {
    [mm_to_print_px(width_mm, dpi), mm_to_print_px(height_mm, dpi)]
}

/// Resize `img` to exactly `target` pixels.
pub fn fit_to_size(img: &RgbaImage, target: [u32; 2], mode: FitMode) -> RgbaImage {
    let [tw, th] = target;
    let (iw, ih) = img.dimensions();
    if iw == 0 || ih == 0 {
        return RgbaImage::new(tw, th);
    }
    match mode {
        FitMode::Stretch => imageops::resize(img, tw, th, FilterType::Lanczos3),
        FitMode::Contain => {
            let scale = (tw as f64 / iw as f64).min(th as f64 / ih as f64);
            let sw = scaled_dim(iw, scale).min(tw);
            let sh = scaled_dim(ih, scale).min(th);
            let scaled = imageops::resize(img, sw, sh, FilterType::Lanczos3);
            let mut canvas = RgbaImage::from_pixel(tw, th, Rgba([0, 0, 0, 0]));
            imageops::replace(
                &mut canvas,
                &scaled,
                i64::from((tw - sw) / 2),
                i64::from((th - sh) / 2),
            );
            canvas
        }
        FitMode::Cover => {
            let scale = (tw as f64 / iw as f64).max(th as f64 / ih as f64);
            let sw = scaled_dim(iw, scale).max(tw);
            let sh = scaled_dim(ih, scale).max(th);
            let scaled = imageops::resize(img, sw, sh, FilterType::Lanczos3);
            imageops::crop_imm(&scaled, (sw - tw) / 2, (sh - th) / 2, tw, th).to_image()
        }
    }
}

fn scaled_dim(d: u32, scale: f64) -> u32 {
    ((d as f64 * scale).round() as u32).max(1)
}

/// Blend `art` onto `base` at `(x, y)` with the overlay blend mode.
///
/// Each pixel moves toward the overlay result by `art alpha × opacity`; the
/// base alpha is kept. Pixels falling outside `base` are skipped.
pub fn overlay_blend(base: &mut RgbaImage, art: &RgbaImage, x: u32, y: u32, opacity: f64) {
    let opacity = opacity.clamp(0.0, 1.0);
    for (ox, oy, src) in art.enumerate_pixels() {
        let weight = src[3] as f64 / 255.0 * opacity;
        if weight <= 0.0 {
            continue;
        }
        let (bx, by) = (x + ox, y + oy);
        if bx >= base.width() || by >= base.height() {
            continue;
        }
        let dst = base.get_pixel_mut(bx, by);
        for c in 0..3 {
            let b = dst[c] as f64 / 255.0;
            let s = src[c] as f64 / 255.0;
            let blended = if b < 0.5 {
                2.0 * b * s
            } else {
                1.0 - 2.0 * (1.0 - b) * (1.0 - s)
            };
            let out = b + (blended - b) * weight;
            dst[c] = (out * 255.0).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Print raster plus optional on-photo preview for one finger.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeOutput {
    pub print: RgbaImage,
    pub preview: Option<RgbaImage>,
}

/// Fit `artwork` to the nail of `measurement` and, when `source` is given,
/// blend it onto the photo at the oracle's nail region.
///
/// A missing region, an oracle error or a region outside the photo yields no
/// preview; the print raster is always produced.
pub fn composite(
    artwork: &RgbaImage,
    measurement: &FingerMeasurement,
    source: Option<&Photo>,
    oracle: &dyn VisionOracle,
    config: &CompositorConfig,
) -> CompositeOutput {
    let (width_mm, length_mm) = (measurement.nail_width_mm(), measurement.nail_length_mm());
    if width_mm > config.max_nail_mm || length_mm > config.max_nail_mm {
        tracing::warn!(
            position = %measurement.position(),
            width_mm,
            length_mm,
            max_nail_mm = config.max_nail_mm,
            "nail exceeds print size limit; clamping"
        );
    }
    let target = target_pixel_size(
        width_mm.min(config.max_nail_mm),
        length_mm.min(config.max_nail_mm),
        config.dpi,
    );
    let print = fit_to_size(artwork, target, config.fit_mode);
    tracing::debug!(
        position = %measurement.position(),
        width_px = target[0],
        height_px = target[1],
        "print raster fitted"
    );

    let preview = match source {
        Some(photo) if config.preview => preview_on_photo(artwork, measurement, photo, oracle, config),
        _ => None,
    };
    CompositeOutput { print, preview }
}

fn preview_on_photo(
    artwork: &RgbaImage,
    measurement: &FingerMeasurement,
    photo: &Photo,
    oracle: &dyn VisionOracle,
    config: &CompositorConfig,
) -> Option<RgbaImage> {
    let region = match oracle.locate_nail_region(photo, measurement) {
        Ok(NailRegionLookup::Found(region)) => region,
        Ok(NailRegionLookup::NotFound) => {
            tracing::debug!(position = %measurement.position(), "nail region not found; no preview");
            return None;
        }
        Err(err) => {
            tracing::warn!(position = %measurement.position(), error = %err, "nail region lookup failed");
            return None;
        }
    };
    let (pw, ph) = photo.dimensions();
    if !region.fits_within(pw, ph) {
        tracing::warn!(
            position = %measurement.position(),
            ?region,
            photo_width = pw,
            photo_height = ph,
            "nail region outside photo; no preview"
        );
        return None;
    }
    let scaled = fit_to_size(artwork, [region.width, region.height], config.fit_mode);
    let mut canvas = photo.image().clone();
    overlay_blend(&mut canvas, &scaled, region.x, region.y, config.overlay_opacity);
    Some(canvas)
}
