//! Fixed palette and pattern tables for fallback art.

use std::fmt;
use std::str::FromStr;

/// An opaque sRGB color, serialized as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaletteColor(pub [u8; 3]);

impl PaletteColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl fmt::Display for PaletteColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for PaletteColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(format!("invalid color '{s}' (expected #rrggbb)"));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid color '{s}'"))
        };
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl serde::Serialize for PaletteColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for PaletteColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Named three-color palette: base, accent, highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub name: &'static str,
    pub base: PaletteColor,
    pub accent: PaletteColor,
    pub highlight: PaletteColor,
}

impl Palette {
    pub fn colors(&self) -> [PaletteColor; 3] {
        [self.base, self.accent, self.highlight]
    }
}

const fn palette(name: &'static str, base: u32, accent: u32, highlight: u32) -> Palette {
    const fn c(v: u32) -> PaletteColor {
        PaletteColor::rgb((v >> 16) as u8, (v >> 8) as u8, v as u8)
    }
    Palette {
        name,
        base: c(base),
        accent: c(accent),
        highlight: c(highlight),
    }
}

/// Palette table; selected by finger index modulo its length.
pub const PALETTES: [Palette; 12] = [
    palette("blush", 0xf4c2c2, 0xc97b84, 0xfff1f1),
    palette("sage", 0xa3b18a, 0x588157, 0xf1f5ec),
    palette("lavender", 0xc8b6e2, 0x7a5c99, 0xf6f0ff),
    palette("coral", 0xff7f6e, 0xd1495b, 0xffe5dc),
    palette("navy", 0x1d3557, 0x457b9d, 0xe8f1f8),
    palette("champagne", 0xe8d5b7, 0xb08d57, 0xfffaf0),
    palette("berry", 0x8e2c48, 0xd1495b, 0xf9dbe2),
    palette("mint", 0xb8e0d2, 0x379683, 0xf0fff8),
    palette("sunset", 0xf4a261, 0xe76f51, 0xfff3e0),
    palette("onyx", 0x2b2d42, 0x8d99ae, 0xedf2f4),
    palette("ocean", 0x48cae4, 0x0077b6, 0xe0fbfc),
    palette("nude", 0xd8b4a0, 0xa0786a, 0xf8ede3),
];

/// Surface pattern of a fallback design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPattern {
    Solid,
    Gradient,
    FrenchTip,
    Stripes,
    Dots,
}

/// Pattern table; selected by finger index modulo its length.
pub const PATTERNS: [FallbackPattern; 5] = [
    FallbackPattern::Solid,
    FallbackPattern::Gradient,
    FallbackPattern::FrenchTip,
    FallbackPattern::Stripes,
    FallbackPattern::Dots,
];

impl FallbackPattern {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Gradient => "gradient",
            Self::FrenchTip => "french tip",
            Self::Stripes => "stripes",
            Self::Dots => "dots",
        }
    }
}

pub fn palette_for_index(index: usize) -> Palette {
    PALETTES[index % PALETTES.len()]
}

pub fn pattern_for_index(index: usize) -> FallbackPattern {
    PATTERNS[index % PATTERNS.len()]
}
