//! Turning image references into bytes.

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

use crate::error::{CaptchaError, Result};
use crate::models::ImageBytes;

/// Remote fetches give up after this long
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

static DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/(?P<mime>.+);base64,").expect("valid data URI pattern")
});

/// Standard alphabet, padding optional
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// A reference to an image as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    RemoteUrl(String),
    DataUri { mime: String, payload: String },
    RawBase64(String),
    RawBytes(Vec<u8>),
}

impl ImageRef {
    /// Classify a textual image reference.
    ///
    /// A string starting with `data:image` whose prefix does not have the
    /// `data:image/<mime>;base64,` shape is treated as bare base64.
    pub fn parse(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            return ImageRef::RemoteUrl(input.to_string());
        }

        if input.starts_with("data:image") {
            if let Some(caps) = DATA_URI.captures(input) {
                let prefix_len = caps.get(0).map_or(0, |m| m.end());
                return ImageRef::DataUri {
                    mime: caps["mime"].to_string(),
                    payload: input[prefix_len..].to_string(),
                };
            }
        }

        ImageRef::RawBase64(input.to_string())
    }

    /// Resolve the reference into image bytes. Nothing is cached: every call
    /// decodes (or fetches) again.
    pub fn resolve(&self) -> Result<ImageBytes> {
        match self {
            ImageRef::RawBytes(bytes) => Ok(ImageBytes::new(bytes.clone())),
            ImageRef::RemoteUrl(url) => fetch(url),
            ImageRef::DataUri { payload, .. } => decode_base64(payload),
            ImageRef::RawBase64(text) => decode_base64(text),
        }
    }
}

impl From<&str> for ImageRef {
    fn from(input: &str) -> Self {
        ImageRef::parse(input)
    }
}

impl From<String> for ImageRef {
    fn from(input: String) -> Self {
        ImageRef::parse(&input)
    }
}

impl From<Vec<u8>> for ImageRef {
    fn from(bytes: Vec<u8>) -> Self {
        ImageRef::RawBytes(bytes)
    }
}

fn decode_base64(text: &str) -> Result<ImageBytes> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(CaptchaError::UnsupportedInput("empty image data".to_string()));
    }

    LENIENT_BASE64
        .decode(compact.as_bytes())
        .map(ImageBytes::new)
        .map_err(|e| CaptchaError::UnsupportedInput(format!("not a URL, data URI or base64 ({})", e)))
}

/// Blocking GET with a fixed timeout.
/// Certificate validation is disabled so captcha hosts with self-signed
/// certificates still resolve.
fn fetch(url: &str) -> Result<ImageBytes> {
    let fetch_error = |reason: String| CaptchaError::Fetch {
        url: url.to_string(),
        reason,
    };

    tracing::debug!(url, "fetching remote image");

    let client = reqwest::blocking::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|e| fetch_error(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| fetch_error(e.to_string()))?;

    let body = response.bytes().map_err(|e| fetch_error(e.to_string()))?;
    Ok(ImageBytes::new(body.to_vec()))
}
