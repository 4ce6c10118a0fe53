use image::GenericImageView;

use crate::engine::{ClassifyOptions, Classifier, Detector};
use crate::error::{CaptchaError, Result};
use crate::models::{ImageBytes, SelectionItem};
use crate::processing::codec;

/// Solve a click captcha: detect every target, then classify each crop.
///
/// Crops are classified one after another in detector order. The first
/// failing crop aborts the whole batch.
pub fn solve(
    image: &ImageBytes,
    detector: &dyn Detector,
    classifier: &dyn Classifier,
    options: &ClassifyOptions,
) -> Result<Vec<SelectionItem>> {
    // Colour decode, alpha dropped
    let img = image::DynamicImage::ImageRgb8(codec::decode(image)?.to_rgb8());
    let (width, height) = img.dimensions();

    // Step 1: one detector pass over the full image
    let boxes = detector
        .detect(image)
        .map_err(CaptchaError::engine)?
        .unwrap_or_default();

    tracing::debug!(count = boxes.len(), "detected selection targets");

    // Step 2: label each target, keeping detector order
    let mut items = Vec::with_capacity(boxes.len());
    for bbox in boxes {
        // Boxes may poke outside the image; only what is left inside gets classified
        let (x, y, w, h) = bbox
            .clamp_to(width, height)
            .ok_or(CaptchaError::EmptyRegion { width: 0, height: 0 })?;

        // Re-encode so the classifier sees a standalone PNG
        let crop = codec::encode_png(&img.crop_imm(x, y, w, h))?;
        let text = classifier
            .classify(&crop, options)
            .map_err(CaptchaError::engine)?;

        // The caller gets the detector's box, not the clamped one
        items.push(SelectionItem { text, bbox });
    }

    Ok(items)
}
