use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::api::response::{Envelope, INTERNAL_ERROR, NOT_FOUND};
use crate::api::state::AppState;
use crate::engine::Charset;
use crate::error::Result;
use crate::pipeline::{CaptchaPipeline, ClassificationParams, RequestContext};
use crate::processing::{ColorSpec, ImageRef};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideRequest {
    pub sliding_image: Option<String>,
    pub back_image: Option<String>,
    pub simple_target: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ClassificationRequest {
    pub image: Option<String>,
    pub png_fix: Option<bool>,
    pub probability: Option<bool>,
    pub color_filter_colors: Option<Vec<ColorSpec>>,
    pub charset_ranges: Option<Charset>,
}

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub image: Option<String>,
    pub charset_ranges: Option<Charset>,
}

#[derive(Debug, Deserialize)]
pub struct CropRequest {
    pub image: Option<String>,
    pub y_coordinate: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RangesRequest {
    pub ranges: Option<Charset>,
}

fn missing(fields: &str) -> Envelope {
    Envelope::param_error(format!("missing required fields: {}", fields))
}

fn rejected(rejection: JsonRejection) -> Envelope {
    Envelope::param_error(rejection.body_text())
}

/// Run a pipeline operation on the blocking pool and wrap the outcome
async fn run<T, F>(state: &AppState, operation: &'static str, job: F) -> Envelope
where
    T: Serialize + Send + 'static,
    F: FnOnce(&CaptchaPipeline) -> Result<T> + Send + 'static,
{
    let pipeline = state.pipeline();
    // Ties the operation's log lines together
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("operation", operation, %request_id);

    // Fetches and inference block; keep them off the async workers
    let outcome = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        job(pipeline.as_ref())
    })
    .await;

    match outcome {
        Ok(Ok(data)) => Envelope::ok(&data),
        Ok(Err(e)) => Envelope::from_error(operation, &e),
        // The job panicked
        Err(e) => {
            tracing::error!(operation, %request_id, error = %e, "operation aborted");
            Envelope::error(INTERNAL_ERROR, "internal server error")
        }
    }
}

/// Resolve the request-scoped charset: request value over stored default
fn request_context(state: &AppState, charset: Option<Charset>) -> std::result::Result<RequestContext, Envelope> {
    let charset = match charset {
        Some(charset) => charset.normalize().map_err(Envelope::param_error)?,
        None => None,
    };
    Ok(state.context().overridden_by(charset))
}

pub async fn capcode(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SlideRequest>, JsonRejection>,
) -> Envelope {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    let (Some(sliding), Some(back)) = (req.sliding_image, req.back_image) else {
        return missing("slidingImage, backImage");
    };
    // Plain template matching unless the caller says the piece is padded
    let simple_target = req.simple_target.unwrap_or(true);

    run(&state, "slide match", move |pipeline| {
        pipeline.capcode(&ImageRef::parse(&sliding), &ImageRef::parse(&back), simple_target)
    })
    .await
}

pub async fn slide_comparison(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SlideRequest>, JsonRejection>,
) -> Envelope {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    let (Some(sliding), Some(back)) = (req.sliding_image, req.back_image) else {
        return missing("slidingImage, backImage");
    };

    run(&state, "slide comparison", move |pipeline| {
        pipeline.slide_comparison(&ImageRef::parse(&sliding), &ImageRef::parse(&back))
    })
    .await
}

pub async fn classification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ClassificationRequest>, JsonRejection>,
) -> Envelope {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    let Some(image) = req.image else {
        return missing("image");
    };
    let context = match request_context(&state, req.charset_ranges) {
        Ok(context) => context,
        Err(envelope) => return envelope,
    };
    let params = ClassificationParams {
        png_fix: req.png_fix.unwrap_or(false),
        probability: req.probability.unwrap_or(false),
        color_filter: req.color_filter_colors,
    };

    run(&state, "classification", move |pipeline| {
        pipeline.classification(&context, &ImageRef::parse(&image), &params)
    })
    .await
}

pub async fn detection(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ImageRequest>, JsonRejection>,
) -> Envelope {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    let Some(image) = req.image else {
        return missing("image");
    };

    run(&state, "detection", move |pipeline| {
        pipeline.detection(&ImageRef::parse(&image))
    })
    .await
}

pub async fn calculate(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CalculateRequest>, JsonRejection>,
) -> Envelope {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    let Some(image) = req.image else {
        return missing("image");
    };
    let context = match request_context(&state, req.charset_ranges) {
        Ok(context) => context,
        Err(envelope) => return envelope,
    };

    run(&state, "calculate", move |pipeline| {
        pipeline.calculate(&context, &ImageRef::parse(&image))
    })
    .await
}

/// Accepts integers, floats (truncated) and numeric strings
fn parse_coordinate(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub async fn crop(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CropRequest>, JsonRejection>,
) -> Envelope {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    let (Some(image), Some(y)) = (req.image, req.y_coordinate) else {
        return missing("image, y_coordinate");
    };
    // Form clients tend to send the row as a string
    let Some(y) = parse_coordinate(&y) else {
        return Envelope::param_error(format!("y_coordinate must be an integer, got {}", y));
    };

    run(&state, "crop", move |pipeline| {
        pipeline.crop(&ImageRef::parse(&image), y)
    })
    .await
}

pub async fn select(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ImageRequest>, JsonRejection>,
) -> Envelope {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    let Some(image) = req.image else {
        return missing("image");
    };
    // No per-request override here; the stored default applies
    let context = state.context();

    run(&state, "select", move |pipeline| {
        pipeline.select(&context, &ImageRef::parse(&image))
    })
    .await
}

/// Store the default charset used by later requests. An empty string clears it.
pub async fn set_ranges(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RangesRequest>, JsonRejection>,
) -> Envelope {
    let Json(req) = match payload {
        Ok(req) => req,
        Err(rejection) => return rejected(rejection),
    };
    let Some(ranges) = req.ranges else {
        return missing("ranges");
    };

    // Echo the value as sent, store the normalized form
    match ranges.clone().normalize() {
        Ok(charset) => {
            state.set_default_charset(charset);
            tracing::info!(?ranges, "default charset updated");
            Envelope::ok_with_msg(&ranges, "charset ranges updated")
        }
        Err(msg) => Envelope::param_error(msg),
    }
}

pub async fn health() -> Envelope {
    Envelope::ok_with_msg(
        &json!({
            "status": "running",
            "version": env!("CARGO_PKG_VERSION"),
        }),
        "API is running",
    )
}

pub async fn not_found() -> Envelope {
    Envelope::error(NOT_FOUND, "route not found")
}
