#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from captcha_pipeline for tests
pub use captcha_pipeline::engine::{Charset, ClassifyOptions, Classifier, Detector, SlideMatcher};
pub use captcha_pipeline::{
    BoundingBox, CaptchaError, CaptchaPipeline, ClassificationParams, ColorSpec, ImageBytes, ImageRef, Number,
    RecognitionResult, RequestContext, SlideOutput, Target,
};
