//! Raster rendering of a fallback [`Layout`].

use image::{Rgba, RgbaImage};

use super::{Layout, FALLBACK_PX_PER_MM, HIGHLIGHT_OPACITY};

/// 2×2 sub-pixel sample offsets used for edge coverage.
const SUBSAMPLES: [(f64, f64); 4] = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];

pub(super) fn render(layout: &Layout) -> RgbaImage {
    let (w, h) = layout.raster_size();
    let mut img = RgbaImage::new(w, h);
    let scale = 1.0 / FALLBACK_PX_PER_MM;

    for (px, py, pixel) in img.enumerate_pixels_mut() {
        let covered = SUBSAMPLES
            .iter()
            .filter(|(ox, oy)| {
                layout
                    .silhouette
                    .contains((px as f64 + ox) * scale, (py as f64 + oy) * scale)
            })
            .count();
        if covered == 0 {
            continue;
        }

        let x = (px as f64 + 0.5) * scale;
        let y = (py as f64 + 0.5) * scale;
        let mut rgb = layout.pattern_rgb(x, y);
        if layout.highlight.contains(x, y) {
            for c in &mut rgb {
                *c += (255.0 - *c) * HIGHLIGHT_OPACITY;
            }
        }
        let alpha = (covered as f64 / SUBSAMPLES.len() as f64 * 255.0).round();
        *pixel = Rgba([to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2]), alpha as u8]);
    }
    img
}

fn to_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
