//! Sequential per-finger design generation with fallback isolation.

use std::collections::BTreeMap;
use std::time::Duration;

use image::RgbaImage;
use thiserror::Error;

use crate::artifact::{Complexity, Origin};
use crate::measurement::{FingerMeasurement, MeasurementSet};

use super::fallback::{size_label, synthesize_fallback, FallbackArt};
use super::palette::PaletteColor;
use super::prompt::{build_prompt, PromptDescription, StylePreferences};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation transport failed: {0}")]
    Transport(String),
    #[error("generation service returned HTTP {code}")]
    Status { code: u16 },
    #[error("generation quota exhausted")]
    Quota,
    #[error("generation response is malformed: {0}")]
    MalformedResponse(String),
    #[error("generated image could not be decoded: {0}")]
    UndecodableImage(String),
    #[error("no image generation backend is configured")]
    Unavailable,
}

/// External generative image service.
pub trait ImageGenerator {
    /// Return encoded image bytes (PNG, JPEG) for `prompt`.
    fn generate(&self, prompt: &PromptDescription) -> Result<Vec<u8>, GenerationError>;
}

/// Backend that never generates; every finger gets fallback art.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineGenerator;

impl ImageGenerator for OfflineGenerator {
    fn generate(&self, _prompt: &PromptDescription) -> Result<Vec<u8>, GenerationError> {
        Err(GenerationError::Unavailable)
    }
}

/// Blocking delay, injected so tests can observe it without waiting.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Fixed delay between successful generation calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RateLimitPolicy {
    pub delay_between_calls_ms: u64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            delay_between_calls_ms: 1_000,
        }
    }
}

impl RateLimitPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_calls_ms)
    }
}

/// Artwork produced for one finger.
#[derive(Debug, Clone, PartialEq)]
pub enum Artwork {
    Generated(RgbaImage),
    Fallback(FallbackArt),
}

/// Design outcome for one finger, before dimensional fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerDesign {
    pub measurement: FingerMeasurement,
    pub prompt: PromptDescription,
    pub artwork: Artwork,
    pub description: String,
    pub palette_colors: Vec<PaletteColor>,
    pub complexity: Complexity,
    /// Why generation fell back, if it did.
    pub failure: Option<String>,
}

impl FingerDesign {
    pub fn origin(&self) -> Origin {
        match self.artwork {
            Artwork::Generated(_) => Origin::Generated,
            Artwork::Fallback(_) => Origin::Fallback,
        }
    }

    /// The raster to fit onto the nail.
    pub fn image(&self) -> &RgbaImage {
        match &self.artwork {
            Artwork::Generated(img) => img,
            Artwork::Fallback(art) => &art.raster,
        }
    }

    pub fn svg(&self) -> Option<&str> {
        match &self.artwork {
            Artwork::Generated(_) => None,
            Artwork::Fallback(art) => Some(&art.svg),
        }
    }
}

/// Generate designs for all ten records, in canonical order.
///
/// Calls run one at a time. A failed call (any [`GenerationError`] or bytes
/// that do not decode) falls back to [`synthesize_fallback`] with the finger's
/// canonical index; the loop always continues. After each successful call
/// that is followed by another finger, `sleeper` waits for the policy delay.
/// Failed calls are not retried.
pub fn generate_designs(
    set: &MeasurementSet,
    style: &StylePreferences,
    generator: &dyn ImageGenerator,
    policy: &RateLimitPolicy,
    sleeper: &dyn Sleeper,
) -> Vec<FingerDesign> {
    let records = set.records();
    let mut designs = Vec::with_capacity(records.len());
    for (i, measurement) in records.iter().enumerate() {
        let prompt = build_prompt(measurement, style);
        let design = match generate_one(generator, &prompt) {
            Ok(image) => {
                tracing::info!(position = %measurement.position(), origin = "generated", "design ready");
                generated_design(measurement, prompt, image, style)
            }
            Err(err) => {
                tracing::warn!(
                    position = %measurement.position(),
                    origin = "fallback",
                    error = %err,
                    "generation failed; using fallback design"
                );
                fallback_design(measurement, prompt, Some(err.to_string()))
            }
        };
        let succeeded = design.origin() == Origin::Generated;
        designs.push(design);
        if succeeded && i + 1 < records.len() {
            sleeper.sleep(policy.delay());
        }
    }
    designs
}

fn generate_one(
    generator: &dyn ImageGenerator,
    prompt: &PromptDescription,
) -> Result<RgbaImage, GenerationError> {
    let bytes = generator.generate(prompt)?;
    let image = image::load_from_memory(&bytes)
        .map_err(|e| GenerationError::UndecodableImage(e.to_string()))?;
    Ok(image.to_rgba8())
}

fn generated_design(
    measurement: &FingerMeasurement,
    prompt: PromptDescription,
    image: RgbaImage,
    style: &StylePreferences,
) -> FingerDesign {
    let description = format!(
        "{} generated design for the {} nail ({})",
        style.style.trim(),
        measurement.position().label(),
        size_label(measurement.nail_width_mm(), measurement.nail_length_mm())
    )
    .trim_start()
    .to_string();
    FingerDesign {
        measurement: measurement.clone(),
        palette_colors: dominant_colors(&image, 3),
        complexity: style.complexity,
        artwork: Artwork::Generated(image),
        prompt,
        description,
        failure: None,
    }
}

/// Fallback design for `measurement`, keyed by its canonical index.
fn fallback_design(
    measurement: &FingerMeasurement,
    prompt: PromptDescription,
    failure: Option<String>,
) -> FingerDesign {
    let art = synthesize_fallback(measurement, measurement.position().index());
    FingerDesign {
        measurement: measurement.clone(),
        description: art.description.clone(),
        palette_colors: art.palette.colors().to_vec(),
        complexity: art.complexity,
        artwork: Artwork::Fallback(art),
        prompt,
        failure,
    }
}

/// Most frequent opaque colors, quantized to 32 levels per channel.
pub fn dominant_colors(image: &RgbaImage, count: usize) -> Vec<PaletteColor> {
    let mut histogram: BTreeMap<[u8; 3], u64> = BTreeMap::new();
    for p in image.pixels() {
        if p[3] < 128 {
            continue;
        }
        let q = [p[0] & 0xf8, p[1] & 0xf8, p[2] & 0xf8];
        *histogram.entry(q).or_default() += 1;
    }
    let mut bins: Vec<([u8; 3], u64)> = histogram.into_iter().collect();
    // Stable on ties: BTreeMap order breaks them.
    bins.sort_by(|a, b| b.1.cmp(&a.1));
    bins.into_iter()
        .take(count)
        .map(|(c, _)| PaletteColor([c[0] | 0x04, c[1] | 0x04, c[2] | 0x04]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finger::FingerPosition;
    use crate::measurement::complete_measurements;
    use crate::test_utils::{solid_image, RecordingSleeper, ScriptedFailure, ScriptedGenerator};

    fn template_set() -> MeasurementSet {
        complete_measurements(&[], None)
    }

    #[test]
    fn failures_are_isolated_per_finger() {
        let set = template_set();
        let generator = ScriptedGenerator::failing_at(&[2, 5, 9]);
        let sleeper = RecordingSleeper::default();
        let designs = generate_designs(
            &set,
            &StylePreferences::default(),
            &generator,
            &RateLimitPolicy::default(),
            &sleeper,
        );
        assert_eq!(designs.len(), 10);
        for (i, d) in designs.iter().enumerate() {
            assert_eq!(d.measurement.position(), FingerPosition::ALL[i]);
            let expect = if generator.failed_indices().contains(&i) {
                Origin::Fallback
            } else {
                Origin::Generated
            };
            assert_eq!(d.origin(), expect, "finger {i}");
        }
        assert_eq!(generator.calls.borrow().len(), 10);
        assert_eq!(sleeper.delays.borrow().len(), 7);
        assert!(sleeper
            .delays
            .borrow()
            .iter()
            .all(|d| *d == Duration::from_millis(1_000)));
    }

    #[test]
    fn no_delay_after_the_last_finger() {
        let set = template_set();
        let generator = ScriptedGenerator::new();
        let sleeper = RecordingSleeper::default();
        generate_designs(
            &set,
            &StylePreferences::default(),
            &generator,
            &RateLimitPolicy {
                delay_between_calls_ms: 250,
            },
            &sleeper,
        );
        assert_eq!(sleeper.delays.borrow().len(), 9);
    }

    #[test]
    fn undecodable_bytes_and_quota_fall_back() {
        let set = template_set();
        let generator = ScriptedGenerator::new()
            .with_failure(0, ScriptedFailure::Garbage)
            .with_failure(1, ScriptedFailure::Quota);
        let sleeper = RecordingSleeper::default();
        let designs = generate_designs(
            &set,
            &StylePreferences::default(),
            &generator,
            &RateLimitPolicy::default(),
            &sleeper,
        );
        assert_eq!(designs[0].origin(), Origin::Fallback);
        assert!(designs[0]
            .failure
            .as_deref()
            .is_some_and(|f| f.contains("decoded")));
        assert_eq!(designs[1].origin(), Origin::Fallback);
        assert_eq!(designs[2].origin(), Origin::Generated);
        assert_eq!(sleeper.delays.borrow().len(), 7);
    }

    #[test]
    fn fallback_uses_canonical_index() {
        let set = template_set();
        let designs = generate_designs(
            &set,
            &StylePreferences::default(),
            &OfflineGenerator,
            &RateLimitPolicy::default(),
            &RecordingSleeper::default(),
        );
        for (i, d) in designs.iter().enumerate() {
            let expected = synthesize_fallback(&d.measurement, i);
            assert_eq!(d.svg(), Some(expected.svg.as_str()));
            assert_eq!(d.complexity, expected.complexity);
        }
    }

    #[test]
    fn dominant_colors_rank_by_frequency() {
        let mut img = solid_image(10, 10, [200, 20, 20, 255]);
        for x in 0..3 {
            img.put_pixel(x, 0, image::Rgba([10, 10, 240, 255]));
        }
        img.put_pixel(9, 9, image::Rgba([0, 255, 0, 0]));
        let colors = dominant_colors(&img, 3);
        assert_eq!(colors.len(), 2);
        assert_eq!(colors[0], PaletteColor([204, 20, 20]));
    }
}
