//! Recognition engine capabilities.
//!
//! The pipeline only talks to the engine through these traits, so any
//! backend (or a test double) can be plugged in.

pub mod ocr;
pub mod slide;

use serde::{Deserialize, Serialize};

use crate::models::{BoundingBox, ImageBytes, RecognitionResult, SlideOutput};

pub use ocr::OcrsEngine;
pub use slide::TemplateSlideMatcher;

/// Character classification
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &ImageBytes, options: &ClassifyOptions) -> anyhow::Result<RecognitionResult>;
}

/// Object detection. `None` means the detector produced no answer at all.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &ImageBytes) -> anyhow::Result<Option<Vec<BoundingBox>>>;
}

/// Slider captcha matching
pub trait SlideMatcher: Send + Sync {
    /// Locate the puzzle piece `target` inside `background`
    fn slide_match(
        &self,
        target: &ImageBytes,
        background: &ImageBytes,
        simple_target: bool,
    ) -> anyhow::Result<SlideOutput>;

    /// Locate the gap by comparing the background with and without it
    fn slide_comparison(&self, target: &ImageBytes, background: &ImageBytes) -> anyhow::Result<SlideOutput>;
}

/// Per-call classification parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Flatten transparency onto white before recognition
    pub png_fix: bool,
    pub probability: bool,
    pub charset: Option<Charset>,
}

const DIGITS: &str = "0123456789";
const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Restriction of the characters a classifier may emit.
///
/// Presets: 0 digits, 1 lowercase, 2 uppercase, 3 lower + upper,
/// 4 lower + digits, 5 upper + digits, 6 lower + upper + digits,
/// 7 everything except ASCII letters and digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Charset {
    Preset(u8),
    Chars(String),
}

impl Charset {
    /// Check a caller supplied charset. Empty alphabets mean "no restriction".
    pub fn normalize(self) -> Result<Option<Self>, String> {
        match self {
            Charset::Preset(p) if p > 7 => Err(format!("charset preset must be 0-7, got {}", p)),
            Charset::Chars(chars) if chars.is_empty() => Ok(None),
            other => Ok(Some(other)),
        }
    }

    pub fn allows(&self, c: char) -> bool {
        let preset: &[&str] = match self {
            Charset::Chars(chars) => return chars.contains(c),
            Charset::Preset(7) => return !c.is_ascii_alphanumeric(),
            Charset::Preset(0) => &[DIGITS],
            Charset::Preset(1) => &[LOWER],
            Charset::Preset(2) => &[UPPER],
            Charset::Preset(3) => &[LOWER, UPPER],
            Charset::Preset(4) => &[LOWER, DIGITS],
            Charset::Preset(5) => &[UPPER, DIGITS],
            Charset::Preset(_) => &[LOWER, UPPER, DIGITS],
        };
        preset.iter().any(|set| set.contains(c))
    }

    /// Drop every character the restriction does not allow
    pub fn restrict(&self, text: &str) -> String {
        text.chars().filter(|c| self.allows(*c)).collect()
    }
}
