use serde::{Deserialize, Serialize};

/// Encoded image data (PNG, JPEG, ...) in its original container format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBytes(Vec<u8>);

impl ImageBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ImageBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ImageBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Detector output in source image coordinates, serialized as `[x1, y1, x2, y2]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "[i64; 4]", into = "[i64; 4]")]
pub struct BoundingBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BoundingBox {
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clamp to an image of the given size.
    /// Returns `(x, y, width, height)` or `None` when nothing of the box is left.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let x1 = self.x1.clamp(0, width as i64) as u32;
        let y1 = self.y1.clamp(0, height as i64) as u32;
        let x2 = self.x2.clamp(0, width as i64) as u32;
        let y2 = self.y2.clamp(0, height as i64) as u32;

        if x2 <= x1 || y2 <= y1 {
            return None;
        }

        Some((x1, y1, x2 - x1, y2 - y1))
    }
}

impl From<[i64; 4]> for BoundingBox {
    fn from([x1, y1, x2, y2]: [i64; 4]) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

impl From<BoundingBox> for [i64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
    }
}

/// Classifier output: bare text, or text with per-character confidence distributions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecognitionResult {
    Text(String),
    WithProbability {
        text: String,
        probability: Vec<Vec<f32>>,
    },
}

impl RecognitionResult {
    pub fn text(&self) -> &str {
        match self {
            RecognitionResult::Text(text) => text,
            RecognitionResult::WithProbability { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionItem {
    pub text: RecognitionResult,
    pub bbox: BoundingBox,
}

/// The two halves produced by a vertical split, each a base64 encoded PNG
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitResult {
    pub sliding_image: String,
    pub back_image: String,
}

/// Result of an arithmetic captcha
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::Int(v) => write!(f, "{}", v),
            Number::Float(v) => write!(f, "{}", v),
        }
    }
}

/// The `target` field of a slide engine record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Scalar(i64),
    Sequence(Vec<i64>),
}

/// Raw slide engine output before shaping
#[derive(Debug, Clone, PartialEq)]
pub enum SlideOutput {
    /// A record carrying a `target` field
    Target(Target),
    /// A bare offset
    Offset(i64),
    /// A record without a `target` field, passed through as-is
    Other(serde_json::Value),
    /// The engine found nothing
    Nothing,
}
