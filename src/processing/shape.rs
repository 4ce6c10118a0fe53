//! Normalizing engine output into the shapes callers see.

use serde_json::Value;

use crate::error::{CaptchaError, Result};
use crate::models::{BoundingBox, RecognitionResult, SlideOutput, Target};

/// Reduce a slide engine answer to the offset (or raw record) returned to callers
pub fn slide(output: SlideOutput, operation: &'static str) -> Result<Value> {
    match output {
        SlideOutput::Target(Target::Sequence(values)) => values
            .first()
            .map(|v| Value::from(*v))
            .ok_or(CaptchaError::NoResult(operation)),
        SlideOutput::Target(Target::Scalar(v)) | SlideOutput::Offset(v) => Ok(Value::from(v)),
        SlideOutput::Other(Value::Null) | SlideOutput::Nothing => Err(CaptchaError::NoResult(operation)),
        SlideOutput::Other(raw) => Ok(raw),
    }
}

/// With `probability` requested, bare text becomes `{text, probability: []}`
pub fn classification(result: RecognitionResult, probability: bool) -> RecognitionResult {
    match result {
        RecognitionResult::Text(text) if probability => RecognitionResult::WithProbability {
            text,
            probability: Vec::new(),
        },
        other => other,
    }
}

pub fn detection(boxes: Option<Vec<BoundingBox>>) -> Vec<BoundingBox> {
    boxes.unwrap_or_default()
}
