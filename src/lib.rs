pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod processing;

pub use error::CaptchaError;
pub use models::{
    BoundingBox, ImageBytes, Number, RecognitionResult, SelectionItem, SlideOutput, SplitResult, Target,
};
pub use pipeline::{CaptchaPipeline, ClassificationParams, RequestContext};
pub use processing::{ColorSpec, ImageRef};
