use anyhow::Context;
use image::{DynamicImage, Rgb, RgbImage};
use ocrs::{ImageSource, OcrEngine, OcrEngineParams};
use rten::Model;
use rten_imageproc::{BoundingRect, RotatedRect};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::engine::{ClassifyOptions, Classifier, Detector};
use crate::models::{BoundingBox, ImageBytes, RecognitionResult};

pub const DETECTION_MODEL: &str = "text-detection.rten";
pub const RECOGNITION_MODEL: &str = "text-recognition.rten";

/// Standard ocrs model cache location (`$HOME/.cache/ocrs`)
pub fn default_model_dir() -> anyhow::Result<PathBuf> {
    let home_dir = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("cannot locate home directory for the ocrs model cache")?;
    Ok(Path::new(&home_dir).join(".cache/ocrs"))
}

/// Classifier and detector backed by ocrs.
///
/// Inference is serialized; the engine is shared between all requests.
pub struct OcrsEngine {
    engine: Mutex<OcrEngine>,
}

impl OcrsEngine {
    /// Load the detection and recognition models from `model_dir`
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let detection_model_path = model_dir.join(DETECTION_MODEL);
        let recognition_model_path = model_dir.join(RECOGNITION_MODEL);

        if !detection_model_path.exists() || !recognition_model_path.exists() {
            anyhow::bail!(
                "ocrs models missing from {} (set OCRS_MODEL_DIR or pass --model-dir)\n  - {}\n  - {}",
                model_dir.display(),
                detection_model_path.display(),
                recognition_model_path.display()
            );
        }

        let detection_model = Model::load_file(&detection_model_path)
            .with_context(|| format!("loading {}", detection_model_path.display()))?;
        let recognition_model = Model::load_file(&recognition_model_path)
            .with_context(|| format!("loading {}", recognition_model_path.display()))?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })?;

        tracing::info!(model_dir = %model_dir.display(), "OCR engine initialized");

        Ok(Self {
            engine: Mutex::new(engine),
        })
    }

    fn with_input<T>(
        &self,
        rgb: &RgbImage,
        f: impl FnOnce(&OcrEngine, &ocrs::OcrInput) -> anyhow::Result<T>,
    ) -> anyhow::Result<T> {
        let engine = self
            .engine
            .lock()
            .map_err(|_| anyhow::anyhow!("OCR engine lock poisoned"))?;

        let source = ImageSource::from_bytes(rgb.as_raw(), rgb.dimensions())
            .map_err(|e| anyhow::anyhow!("invalid OCR input: {:?}", e))?;
        let input = engine.prepare_input(source)?;
        f(&engine, &input)
    }
}

impl Classifier for OcrsEngine {
    fn classify(&self, image: &ImageBytes, options: &ClassifyOptions) -> anyhow::Result<RecognitionResult> {
        let img = image::load_from_memory(image.as_slice())?;
        let rgb = if options.png_fix {
            flatten_onto_white(&img)
        } else {
            img.to_rgb8()
        };

        let text = self.with_input(&rgb, |engine, input| engine.get_text(input))?;

        // Captcha answers never contain whitespace
        let text: String = text.split_whitespace().collect();
        let text = match &options.charset {
            Some(charset) => charset.restrict(&text),
            None => text,
        };

        // ocrs does not expose per-character distributions
        Ok(RecognitionResult::Text(text))
    }
}

impl Detector for OcrsEngine {
    fn detect(&self, image: &ImageBytes) -> anyhow::Result<Option<Vec<BoundingBox>>> {
        let rgb = image::load_from_memory(image.as_slice())?.to_rgb8();
        let words = self.with_input(&rgb, |engine, input| engine.detect_words(input))?;

        tracing::debug!(count = words.len(), "ocrs detected words");

        Ok(Some(words.iter().map(word_box).collect()))
    }
}

/// Axis-aligned box enclosing a (possibly rotated) word, rounded outwards
fn word_box(word: &RotatedRect) -> BoundingBox {
    let rect = word.bounding_rect();
    BoundingBox::new(
        rect.left().floor() as i64,
        rect.top().floor() as i64,
        rect.right().ceil() as i64,
        rect.bottom().ceil() as i64,
    )
}

/// Composite transparent pixels onto a white background
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    let mut flat = RgbImage::new(rgba.width(), rgba.height());

    for (dst, src) in flat.pixels_mut().zip(rgba.pixels()) {
        let alpha = src[3] as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        *dst = Rgb([blend(src[0]), blend(src[1]), blend(src[2])]);
    }

    flat
}
