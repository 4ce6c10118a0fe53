use image::{DynamicImage, GenericImageView};

use crate::error::{CaptchaError, Result};
use crate::models::{ImageBytes, SplitResult};
use crate::processing::codec;

/// Split an image into the rows above `y` and the rows from `2 * y` down.
///
/// The band `[y, 2y)` is dropped. Either half coming out empty is an error.
pub fn split(image: &ImageBytes, y: i64) -> Result<SplitResult> {
    let img = codec::decode(image)?;
    let (upper, lower) = split_image(&img, y)?;

    Ok(SplitResult {
        sliding_image: codec::to_base64(&codec::encode_png(&upper)?),
        back_image: codec::to_base64(&codec::encode_png(&lower)?),
    })
}

/// Crop both regions without encoding them
pub fn split_image(img: &DynamicImage, y: i64) -> Result<(DynamicImage, DynamicImage)> {
    let (width, height) = img.dimensions();

    let upper_rows = y.clamp(0, height as i64) as u32;
    let lower_start = y.saturating_mul(2).clamp(0, height as i64) as u32;
    let lower_rows = height - lower_start;

    for rows in [upper_rows, lower_rows] {
        if rows == 0 || width == 0 {
            return Err(CaptchaError::EmptyRegion {
                width,
                height: rows,
            });
        }
    }

    let upper = img.crop_imm(0, 0, width, upper_rows);
    let lower = img.crop_imm(0, lower_start, width, lower_rows);
    Ok((upper, lower))
}
