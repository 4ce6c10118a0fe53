use serde_json::Value;
use std::sync::Arc;

use crate::engine::{Charset, ClassifyOptions, Classifier, Detector, SlideMatcher};
use crate::error::{CaptchaError, Result};
use crate::models::{BoundingBox, Number, RecognitionResult, SelectionItem, SplitResult};
use crate::processing::{ColorSpec, ImageRef, color, expression, select, shape, split};

/// Context available to every operation of a single request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Charset applied to classification calls made for this request
    pub charset: Option<Charset>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_charset(mut self, charset: Option<Charset>) -> Self {
        self.charset = charset;
        self
    }

    /// Replace the charset when the request brings its own
    pub fn overridden_by(self, charset: Option<Charset>) -> Self {
        match charset {
            Some(charset) => self.with_charset(Some(charset)),
            None => self,
        }
    }

    fn classify_options(&self) -> ClassifyOptions {
        ClassifyOptions {
            charset: self.charset.clone(),
            ..Default::default()
        }
    }
}

/// Parameters of a classification request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassificationParams {
    pub png_fix: bool,
    pub probability: bool,
    pub color_filter: Option<Vec<ColorSpec>>,
}

/// Captcha pipeline orchestrator.
///
/// Resolves image references, runs pre-recognition transforms, calls the
/// recognition engine and shapes its answers.
pub struct CaptchaPipeline {
    classifier: Arc<dyn Classifier>,
    detector: Arc<dyn Detector>,
    slide_matcher: Arc<dyn SlideMatcher>,
}

impl CaptchaPipeline {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        detector: Arc<dyn Detector>,
        slide_matcher: Arc<dyn SlideMatcher>,
    ) -> Self {
        Self {
            classifier,
            detector,
            slide_matcher,
        }
    }

    /// Slider captcha by template matching; returns the target x offset
    pub fn capcode(&self, sliding: &ImageRef, back: &ImageRef, simple_target: bool) -> Result<Value> {
        logged("slide match", || {
            // Both images must resolve before the engine is involved
            let sliding = sliding.resolve()?;
            let back = back.resolve()?;
            let output = self
                .slide_matcher
                .slide_match(&sliding, &back, simple_target)
                .map_err(CaptchaError::engine)?;
            shape::slide(output, "slide match")
        })
    }

    /// Slider captcha by image comparison
    pub fn slide_comparison(&self, sliding: &ImageRef, back: &ImageRef) -> Result<Value> {
        logged("slide comparison", || {
            let sliding = sliding.resolve()?;
            let back = back.resolve()?;
            let output = self
                .slide_matcher
                .slide_comparison(&sliding, &back)
                .map_err(CaptchaError::engine)?;
            shape::slide(output, "slide comparison")
        })
    }

    /// Text OCR, optionally restricted to some colours first
    pub fn classification(
        &self,
        context: &RequestContext,
        image: &ImageRef,
        params: &ClassificationParams,
    ) -> Result<RecognitionResult> {
        logged("classification", || {
            let mut bytes = image.resolve()?;

            // An empty colour list means "no filtering", not "mask everything"
            if let Some(colors) = params.color_filter.as_deref().filter(|c| !c.is_empty()) {
                bytes = color::isolate(&bytes, colors);
            }

            let options = ClassifyOptions {
                png_fix: params.png_fix,
                probability: params.probability,
                charset: context.charset.clone(),
            };
            let result = self
                .classifier
                .classify(&bytes, &options)
                .map_err(CaptchaError::engine)?;

            // Callers asking for probabilities always get the field back
            Ok(shape::classification(result, params.probability))
        })
    }

    pub fn detection(&self, image: &ImageRef) -> Result<Vec<BoundingBox>> {
        logged("detection", || {
            let bytes = image.resolve()?;
            let boxes = self.detector.detect(&bytes).map_err(CaptchaError::engine)?;
            // A detector with no answer reads as "nothing found"
            Ok(shape::detection(boxes))
        })
    }

    /// Arithmetic captcha: recognize the expression, then evaluate it
    pub fn calculate(&self, context: &RequestContext, image: &ImageRef) -> Result<Number> {
        logged("calculate", || {
            let bytes = image.resolve()?;
            // Plain text only; probabilities are useless for arithmetic
            let recognized = self
                .classifier
                .classify(&bytes, &context.classify_options())
                .map_err(CaptchaError::engine)?;

            tracing::debug!(text = recognized.text(), "recognized arithmetic captcha");
            let answer = expression::evaluate(recognized.text())?;
            tracing::debug!(%answer, "evaluated arithmetic captcha");

            Ok(answer)
        })
    }

    /// Split an image into the sliding piece (above `y`) and the background (from `2y`)
    pub fn crop(&self, image: &ImageRef, y: i64) -> Result<SplitResult> {
        logged("crop", || split::split(&image.resolve()?, y))
    }

    /// Click captcha: detect targets and label each one
    pub fn select(&self, context: &RequestContext, image: &ImageRef) -> Result<Vec<SelectionItem>> {
        logged("select", || {
            let bytes = image.resolve()?;
            select::solve(
                &bytes,
                self.detector.as_ref(),
                self.classifier.as_ref(),
                &context.classify_options(),
            )
        })
    }
}

fn logged<T>(operation: &'static str, run: impl FnOnce() -> Result<T>) -> Result<T> {
    let result = run();
    if let Err(e) = &result {
        tracing::error!(operation, error = %e, "captcha operation failed");
    }
    result
}
