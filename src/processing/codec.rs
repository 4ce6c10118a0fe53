use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

use crate::error::Result;
use crate::models::ImageBytes;

/// Decode an image from its container format
pub fn decode(bytes: &ImageBytes) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes.as_slice())?)
}

/// Encode an image as PNG
pub fn encode_png(img: &DynamicImage) -> Result<ImageBytes> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)?;
    Ok(ImageBytes::new(buffer.into_inner()))
}

/// Encode bytes as standard padded base64
pub fn to_base64(bytes: &ImageBytes) -> String {
    STANDARD.encode(bytes.as_slice())
}
