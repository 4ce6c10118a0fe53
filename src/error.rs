/// Failures of the captcha pipeline.
#[derive(Debug, thiserror::Error)]
pub enum CaptchaError {
    #[error("unsupported image data: {0}")]
    UnsupportedInput(String),
    #[error("failed to fetch image from {url}: {reason}")]
    Fetch { url: String, reason: String },
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("no arithmetic expression in recognized text {0:?}")]
    NoExpression(String),
    #[error("failed to evaluate {expression:?}: {reason}")]
    Evaluation { expression: String, reason: String },
    #[error("recognition engine failed: {0}")]
    Engine(String),
    #[error("region {width}x{height} is empty")]
    EmptyRegion { width: u32, height: u32 },
    #[error("{0} produced no result")]
    NoResult(&'static str),
}

impl CaptchaError {
    /// Whether the failure is caused by the caller's input rather than by processing.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            CaptchaError::UnsupportedInput(_) | CaptchaError::Decode(_)
        )
    }

    pub(crate) fn engine(err: anyhow::Error) -> Self {
        CaptchaError::Engine(format!("{:#}", err))
    }
}

impl From<image::ImageError> for CaptchaError {
    fn from(err: image::ImageError) -> Self {
        CaptchaError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CaptchaError>;
