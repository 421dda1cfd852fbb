//! Design stage: prompt building, generation, and deterministic fallback art.

pub mod fallback;
mod generate;
mod http;
pub mod palette;
mod prompt;

pub use fallback::{synthesize_fallback, FallbackArt, FALLBACK_PX_PER_MM};
pub use generate::{
    dominant_colors, generate_designs, Artwork, FingerDesign, GenerationError, ImageGenerator,
    OfflineGenerator, RateLimitPolicy, Sleeper, ThreadSleeper,
};
pub use http::{GenerationServiceConfig, HttpImageGenerator, API_KEY_ENV};
pub use palette::{FallbackPattern, Palette, PaletteColor, PALETTES, PATTERNS};
pub use prompt::{
    build_prompt, shape_phrase, CurvatureBand, LengthBand, PromptDescription, StylePreferences,
    WidthBand,
};
