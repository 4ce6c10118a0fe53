use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template};

use crate::engine::SlideMatcher;
use crate::models::{ImageBytes, SlideOutput, Target};

/// Slide matcher built on normalized cross-correlation template matching
pub struct TemplateSlideMatcher {
    pub low_threshold: f32,
    pub high_threshold: f32,
    /// Per-pixel luma difference counted as "changed" in slide comparison
    pub diff_threshold: u8,
    /// Changed pixels needed in a column/row before it marks the gap
    pub min_changed: u32,
    /// Subtracted from the gap column to land on the piece's left edge
    pub gap_margin: u32,
}

impl TemplateSlideMatcher {
    pub fn new() -> Self {
        Self {
            low_threshold: 50.0,
            high_threshold: 150.0,
            diff_threshold: 80,
            min_changed: 5,
            gap_margin: 5,
        }
    }
}

impl Default for TemplateSlideMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl SlideMatcher for TemplateSlideMatcher {
    fn slide_match(
        &self,
        target: &ImageBytes,
        background: &ImageBytes,
        simple_target: bool,
    ) -> anyhow::Result<SlideOutput> {
        let target = image::load_from_memory(target.as_slice())?;
        let background = image::load_from_memory(background.as_slice())?;

        let (template, search) = if simple_target {
            (target.to_luma8(), background.to_luma8())
        } else {
            // Puzzle pieces come padded with transparency; match on edges of the opaque part
            let piece = trim_transparent(&target);
            (
                canny(&piece.to_luma8(), self.low_threshold, self.high_threshold),
                canny(&background.to_luma8(), self.low_threshold, self.high_threshold),
            )
        };

        let (tw, th) = template.dimensions();
        if tw == 0 || th == 0 || tw > search.width() || th > search.height() {
            tracing::debug!(tw, th, "slide piece does not fit the background");
            return Ok(SlideOutput::Nothing);
        }

        let scores = match_template(&search, &template, MatchTemplateMethod::CrossCorrelationNormalized);
        let (x, y) = find_extremes(&scores).max_value_location;

        Ok(SlideOutput::Target(Target::Sequence(vec![
            x as i64,
            y as i64,
            (x + tw) as i64,
            (y + th) as i64,
        ])))
    }

    fn slide_comparison(&self, target: &ImageBytes, background: &ImageBytes) -> anyhow::Result<SlideOutput> {
        let with_gap = image::load_from_memory(target.as_slice())?.to_luma8();
        let without_gap = image::load_from_memory(background.as_slice())?.to_luma8();

        if with_gap.dimensions() != without_gap.dimensions() {
            anyhow::bail!(
                "slide comparison needs equally sized images, got {:?} and {:?}",
                with_gap.dimensions(),
                without_gap.dimensions()
            );
        }

        let changed = difference_mask(&with_gap, &without_gap, self.diff_threshold);
        let (width, height) = changed.dimensions();

        let column = (0..width).find(|&x| {
            (0..height).filter(|&y| changed[(x, y)][0] != 0).count() as u32 >= self.min_changed
        });
        let row = (0..height).find(|&y| {
            (0..width).filter(|&x| changed[(x, y)][0] != 0).count() as u32 >= self.min_changed
        });

        match (column, row) {
            (Some(x), Some(y)) => Ok(SlideOutput::Target(Target::Sequence(vec![
                x.saturating_sub(self.gap_margin) as i64,
                y as i64,
            ]))),
            _ => Ok(SlideOutput::Nothing),
        }
    }
}

fn difference_mask(a: &GrayImage, b: &GrayImage, threshold: u8) -> GrayImage {
    let mut mask = GrayImage::new(a.width(), a.height());
    for ((dst, pa), pb) in mask.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
        if pa[0].abs_diff(pb[0]) > threshold {
            dst[0] = 255;
        }
    }
    mask
}

/// Crop away fully transparent borders
fn trim_transparent(img: &DynamicImage) -> DynamicImage {
    if !img.color().has_alpha() {
        return img.clone();
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut min_x = width;
    let mut min_y = height;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut has_content = false;

    for (x, y, pixel) in rgba.enumerate_pixels() {
        if pixel[3] > 0 {
            has_content = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !has_content {
        return img.clone();
    }

    img.crop_imm(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}
