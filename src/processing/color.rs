//! HSV colour isolation.
//!
//! Hue uses the 8-bit OpenCV convention (degrees / 2, so `[0, 180)`),
//! saturation and value are scaled to `[0, 255]`.

use image::{DynamicImage, Rgb, RgbImage};
use serde::Deserialize;

use crate::error::Result;
use crate::models::ImageBytes;
use crate::processing::codec;

/// Inclusive HSV bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRange {
    pub lower: [i64; 3],
    pub upper: [i64; 3],
}

impl ColorRange {
    pub const fn new(lower: [i64; 3], upper: [i64; 3]) -> Self {
        Self { lower, upper }
    }

    /// Look up one of the preset colours
    pub fn named(name: &str) -> Option<Self> {
        let range = match name {
            "red" => ColorRange::new([0, 50, 50], [10, 255, 255]),
            "green" => ColorRange::new([50, 50, 50], [70, 255, 255]),
            "blue" => ColorRange::new([100, 50, 50], [130, 255, 255]),
            "yellow" => ColorRange::new([20, 50, 50], [30, 255, 255]),
            "orange" => ColorRange::new([10, 50, 50], [20, 255, 255]),
            "purple" => ColorRange::new([130, 50, 50], [160, 255, 255]),
            "pink" => ColorRange::new([160, 50, 50], [180, 255, 255]),
            _ => return None,
        };
        Some(range)
    }

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|i| {
            let v = hsv[i] as i64;
            v >= self.lower[i] && v <= self.upper[i]
        })
    }
}

/// A requested colour: a preset name or literal `[[h,s,v],[h,s,v]]` bounds.
/// Anything else deserializes to `Unrecognized` and is skipped.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Named(String),
    Custom([[i64; 3]; 2]),
    Unrecognized(serde_json::Value),
}

impl ColorSpec {
    pub fn range(&self) -> Option<ColorRange> {
        match self {
            ColorSpec::Named(name) => ColorRange::named(name),
            ColorSpec::Custom([lower, upper]) => Some(ColorRange::new(*lower, *upper)),
            ColorSpec::Unrecognized(_) => None,
        }
    }
}

impl From<&str> for ColorSpec {
    fn from(name: &str) -> Self {
        ColorSpec::Named(name.to_string())
    }
}

/// Convert an RGB pixel to 8-bit HSV
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = pixel.0.map(|c| c as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;

    let s = if max == 0.0 { 0.0 } else { diff * 255.0 / max };

    let mut h = if diff == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / diff
    } else if max == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }

    let mut h = (h / 2.0).round() as u16;
    if h >= 180 {
        h -= 180;
    }

    [h as u8, s.round() as u8, max as u8]
}

/// Keep only the pixels matching any of `colors`; everything else turns black.
///
/// Best effort: if the image cannot be processed the input is returned unchanged.
pub fn isolate(image: &ImageBytes, colors: &[ColorSpec]) -> ImageBytes {
    match try_isolate(image, colors) {
        Ok(filtered) => filtered,
        Err(e) => {
            tracing::warn!(error = %e, "colour isolation failed, using original image");
            image.clone()
        }
    }
}

fn try_isolate(image: &ImageBytes, colors: &[ColorSpec]) -> Result<ImageBytes> {
    let rgb = codec::decode(image)?.to_rgb8();
    let (width, height) = rgb.dimensions();

    let hsv: Vec<[u8; 3]> = rgb.pixels().map(|p| rgb_to_hsv(*p)).collect();

    // Masks are summed with 8-bit wraparound, not OR-ed
    let mut mask = vec![0u8; hsv.len()];
    for range in colors.iter().filter_map(ColorSpec::range) {
        for (acc, pixel) in mask.iter_mut().zip(&hsv) {
            if range.contains(*pixel) {
                *acc = acc.wrapping_add(255);
            }
        }
    }

    let mut masked = RgbImage::new(width, height);
    for ((dst, src), m) in masked.pixels_mut().zip(rgb.pixels()).zip(&mask) {
        if *m != 0 {
            *dst = *src;
        }
    }

    codec::encode_png(&DynamicImage::ImageRgb8(masked))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_colours_map_to_opencv_hues() {
        assert_eq!(rgb_to_hsv(Rgb([255, 0, 0])), [0, 255, 255]);
        assert_eq!(rgb_to_hsv(Rgb([0, 255, 0])), [60, 255, 255]);
        assert_eq!(rgb_to_hsv(Rgb([0, 0, 255])), [120, 255, 255]);
        assert_eq!(rgb_to_hsv(Rgb([0, 0, 0])), [0, 0, 0]);
        assert_eq!(rgb_to_hsv(Rgb([255, 255, 255])), [0, 0, 255]);
    }

    #[test]
    fn custom_bounds_are_inclusive() {
        let range = ColorRange::new([10, 20, 30], [10, 20, 30]);
        assert!(range.contains([10, 20, 30]));
        assert!(!range.contains([11, 20, 30]));
    }

    #[test]
    fn unknown_names_have_no_range() {
        assert!(ColorSpec::from("teal").range().is_none());
        assert_eq!(
            ColorSpec::from("pink").range(),
            Some(ColorRange::new([160, 50, 50], [180, 255, 255]))
        );
    }
}
