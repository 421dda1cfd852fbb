//! SVG rendering of a fallback [`Layout`].
//!
//! Coordinates are millimeters with fixed two-decimal formatting.

use std::fmt::Write as _;

use super::{EllipseMm, Layout, FRENCH_TIP_FRACTION, HIGHLIGHT_OPACITY, STRIPE_COUNT};
use crate::design::palette::FallbackPattern;

pub(super) fn render(layout: &Layout, label: &str) -> String {
    let mut out = String::new();
    // `write!` into a String cannot fail.
    let _ = write_document(&mut out, layout, label);
    out
}

fn write_document(out: &mut String, layout: &Layout, label: &str) -> std::fmt::Result {
    let (w, h) = (layout.canvas_w_mm, layout.canvas_h_mm);
    let p = &layout.palette;
    let s = &layout.silhouette;

    writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.2}mm" height="{h:.2}mm" viewBox="0 0 {w:.2} {h:.2}">"#
    )?;
    writeln!(out, "  <defs>")?;
    writeln!(out, r#"    <clipPath id="nail">{}</clipPath>"#, ellipse_tag(s, ""))?;
    if layout.pattern == FallbackPattern::Gradient {
        writeln!(
            out,
            r#"    <linearGradient id="fill" x1="0" y1="0" x2="0" y2="1"><stop offset="0" stop-color="{}"/><stop offset="1" stop-color="{}"/></linearGradient>"#,
            p.base, p.accent
        )?;
    }
    writeln!(out, "  </defs>")?;

    let base_fill = match layout.pattern {
        FallbackPattern::Gradient => "url(#fill)".to_string(),
        _ => p.base.to_hex(),
    };
    writeln!(out, "  {}", ellipse_tag(s, &format!(r#" fill="{base_fill}""#)))?;

    writeln!(out, r#"  <g clip-path="url(#nail)">"#)?;
    match layout.pattern {
        FallbackPattern::Solid | FallbackPattern::Gradient => {}
        FallbackPattern::FrenchTip => {
            writeln!(
                out,
                r#"    <rect x="0.00" y="{:.2}" width="{w:.2}" height="{:.2}" fill="{}"/>"#,
                s.top(),
                s.height() * FRENCH_TIP_FRACTION,
                p.highlight
            )?;
        }
        FallbackPattern::Stripes => {
            let band = s.height() / STRIPE_COUNT as f64;
            for i in (1..STRIPE_COUNT).step_by(2) {
                writeln!(
                    out,
                    r#"    <rect x="0.00" y="{:.2}" width="{w:.2}" height="{band:.2}" fill="{}"/>"#,
                    s.top() + band * i as f64,
                    p.accent
                )?;
            }
        }
        FallbackPattern::Dots => {
            let (nx, ny) = layout.dot_grid_extent();
            let pitch = layout.dot_pitch_mm;
            for j in -ny..=ny {
                for i in -nx..=nx {
                    writeln!(
                        out,
                        r#"    <circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"/>"#,
                        s.cx + i as f64 * pitch,
                        s.cy + j as f64 * pitch,
                        layout.dot_radius_mm(),
                        p.accent
                    )?;
                }
            }
        }
    }
    writeln!(
        out,
        "    {}",
        ellipse_tag(
            &layout.highlight,
            &format!(r##" fill="#ffffff" fill-opacity="{HIGHLIGHT_OPACITY:.2}""##)
        )
    )?;
    writeln!(out, "  </g>")?;

    let font = (w.min(h) * 0.12).max(0.5);
    writeln!(
        out,
        r#"  <text x="{:.2}" y="{:.2}" font-family="sans-serif" font-size="{font:.2}" text-anchor="middle" fill="{}">{label}</text>"#,
        w / 2.0,
        h - font * 0.4,
        p.accent
    )?;
    writeln!(out, "</svg>")
}

fn ellipse_tag(e: &EllipseMm, attrs: &str) -> String {
    format!(
        r#"<ellipse cx="{:.2}" cy="{:.2}" rx="{:.2}" ry="{:.2}"{attrs}/>"#,
        e.cx, e.cy, e.rx, e.ry
    )
}
