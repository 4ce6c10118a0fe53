//! Integration tests for the image processing components.
//!
//! Tests cover:
//! - Image reference resolution (data URI, base64, bytes, remote)
//! - Colour isolation masking
//! - Vertical splitting with the dropped middle band

mod common;

use captcha_pipeline::processing::{color, split};
use common::*;

#[test]
fn test_data_uri_resolves_identically_twice() -> anyhow::Result<()> {
    let image = red_blue(8, 4);
    let reference = ImageRef::parse(&data_uri(&image));

    assert!(matches!(&reference, ImageRef::DataUri { mime, .. } if mime == "png"));
    let first = reference.resolve()?;
    let second = reference.resolve()?;

    assert_eq!(first, second);
    assert_eq!(first, image);
    Ok(())
}

#[test]
fn test_all_reference_kinds_resolve_to_the_same_bytes() -> anyhow::Result<()> {
    let image = row_gradient(4, 4);

    let from_bytes = ImageRef::from(image.as_slice().to_vec()).resolve()?;
    let from_base64 = ImageRef::parse(&base64(&image)).resolve()?;
    let unpadded = base64(&image).trim_end_matches('=').to_string();
    let from_unpadded = ImageRef::parse(&unpadded).resolve()?;

    assert_eq!(from_bytes, image);
    assert_eq!(from_base64, image);
    assert_eq!(from_unpadded, image);
    Ok(())
}

#[test]
fn test_garbage_text_is_unsupported() {
    let result = ImageRef::parse("definitely not an image!").resolve();
    assert!(matches!(result, Err(CaptchaError::UnsupportedInput(_))));

    // Malformed data URI prefix falls through to bare base64
    let result = ImageRef::parse("data:image/png,abc").resolve();
    assert!(matches!(result, Err(CaptchaError::UnsupportedInput(_))));
}

#[test]
fn test_unreachable_url_is_a_fetch_error() {
    let reference = ImageRef::parse("http://127.0.0.1:9/captcha.png");
    assert!(matches!(reference, ImageRef::RemoteUrl(_)));
    assert!(matches!(reference.resolve(), Err(CaptchaError::Fetch { .. })));
}

#[test]
fn test_remote_image_is_fetched_verbatim() -> anyhow::Result<()> {
    let image = red_blue(6, 6);
    let addr = serve_image(&image);

    let reference = ImageRef::parse(&format!("http://{}/captcha.png", addr));
    assert_eq!(reference.resolve()?, image);
    Ok(())
}

#[test]
fn test_remote_error_status_is_a_fetch_error() {
    let addr = serve_image(&red_blue(6, 6));
    let url = format!("http://{}/missing.png", addr);

    match ImageRef::parse(&url).resolve() {
        Err(CaptchaError::Fetch { url: failed, reason }) => {
            assert_eq!(failed, url);
            assert!(reason.contains("404"), "unexpected reason: {}", reason);
        }
        other => panic!("expected a fetch error, got {:?}", other),
    }
}

#[test]
fn test_isolate_keeps_only_requested_colour() {
    let filtered = color::isolate(&red_blue(10, 2), &[ColorSpec::from("red")]);
    let img = decode(&filtered).to_rgb8();

    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(img.get_pixel(9, 1).0, [0, 0, 0]);
}

#[test]
fn test_isolate_with_no_colours_blacks_out_everything() {
    let filtered = color::isolate(&red_blue(10, 2), &[]);
    let img = decode(&filtered).to_rgb8();

    assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));
}

#[test]
fn test_isolate_is_idempotent() {
    let colors = vec![ColorSpec::from("blue"), ColorSpec::Custom([[0, 50, 50], [5, 255, 255]])];
    let once = color::isolate(&red_blue(10, 4), &colors);
    let twice = color::isolate(&once, &colors);

    assert_eq!(decode(&once).to_rgb8(), decode(&twice).to_rgb8());
    // Both halves matched one of the ranges
    assert_eq!(decode(&once).to_rgb8(), decode(&red_blue(10, 4)).to_rgb8());
}

#[test]
fn test_overlapping_ranges_still_keep_pixels() {
    let colors = vec![ColorSpec::from("red"), ColorSpec::from("red"), ColorSpec::from("teal")];
    let img = decode(&color::isolate(&red_blue(10, 2), &colors)).to_rgb8();

    assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
    assert_eq!(img.get_pixel(9, 0).0, [0, 0, 0]);
}

#[test]
fn test_isolate_returns_undecodable_input_unchanged() {
    let garbage = ImageBytes::new(b"not an image".to_vec());
    assert_eq!(color::isolate(&garbage, &[ColorSpec::from("red")]), garbage);
}

#[test]
fn test_split_drops_the_middle_band() -> anyhow::Result<()> {
    let result = split::split(&row_gradient(20, 300), 50)?;

    let upper = decode_base64_image(&result.sliding_image).to_luma8();
    let lower = decode_base64_image(&result.back_image).to_luma8();

    assert_eq!(upper.dimensions(), (20, 50));
    assert_eq!(lower.dimensions(), (20, 200));
    assert_eq!(upper.get_pixel(0, 49)[0], 49);
    // Lower region starts at row 2 * y
    assert_eq!(lower.get_pixel(0, 0)[0], 100);
    Ok(())
}

#[test]
fn test_split_of_split_is_deterministic() -> anyhow::Result<()> {
    let first = split::split(&row_gradient(10, 120), 30)?;
    let upper = ImageRef::parse(&first.sliding_image).resolve()?;

    let again = split::split(&upper, 10)?;
    let once_more = split::split(&upper, 10)?;
    assert_eq!(again, once_more);
    assert_eq!(decode_base64_image(&again.back_image).height(), 10);
    Ok(())
}

#[test]
fn test_split_with_empty_region_fails() {
    let image = row_gradient(10, 100);
    for y in [0, -3, 50, 400] {
        assert!(
            matches!(split::split(&image, y), Err(CaptchaError::EmptyRegion { .. })),
            "y = {} should leave an empty region",
            y
        );
    }
}

#[test]
fn test_split_rejects_non_images() {
    let result = split::split(&ImageBytes::new(vec![1, 2, 3]), 10);
    assert!(matches!(result, Err(CaptchaError::Decode(_))));
}
