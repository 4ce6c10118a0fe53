//! Uniform `{code, msg, data?}` response envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::error::CaptchaError;

pub const SUCCESS: i32 = 0;
pub const PARAM_ERROR: i32 = 400;
pub const NOT_FOUND: i32 = 404;
pub const INTERNAL_ERROR: i32 = 500;
pub const SERVICE_ERROR: i32 = 503;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn ok<T: Serialize>(data: &T) -> Self {
        Self::ok_with_msg(data, "success")
    }

    pub fn ok_with_msg<T: Serialize>(data: &T, msg: impl Into<String>) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self {
                code: SUCCESS,
                msg: msg.into(),
                data: Some(data),
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize response data");
                Self::error(INTERNAL_ERROR, "internal server error")
            }
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn param_error(msg: impl Into<String>) -> Self {
        Self::error(PARAM_ERROR, msg)
    }

    /// Map a pipeline failure: caller mistakes are parameter errors,
    /// everything else a recoverable service error.
    pub fn from_error(operation: &str, err: &CaptchaError) -> Self {
        if err.is_bad_input() {
            Self::param_error(err.to_string())
        } else {
            Self::error(SERVICE_ERROR, format!("{} failed: {}", operation, err))
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        // Outcomes travel in `code`; only unknown routes and crashed workers change the HTTP status
        let status = match self.code {
            NOT_FOUND => StatusCode::NOT_FOUND,
            INTERNAL_ERROR => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::OK,
        };
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_carries_data() {
        let envelope = Envelope::ok(&json!([1, 2]));
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"code": 0, "msg": "success", "data": [1, 2]})
        );
    }

    #[test]
    fn errors_omit_data() {
        let envelope = Envelope::error(SERVICE_ERROR, "boom");
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"code": 503, "msg": "boom"})
        );
    }

    #[test]
    fn http_status_follows_code() {
        let status = |envelope: Envelope| envelope.into_response().status();

        assert_eq!(status(Envelope::ok(&1)), StatusCode::OK);
        assert_eq!(status(Envelope::param_error("bad")), StatusCode::OK);
        assert_eq!(status(Envelope::error(SERVICE_ERROR, "busy")), StatusCode::OK);
        assert_eq!(status(Envelope::error(NOT_FOUND, "gone")), StatusCode::NOT_FOUND);
        assert_eq!(
            status(Envelope::error(INTERNAL_ERROR, "internal server error")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn pipeline_errors_map_to_codes() {
        let bad = Envelope::from_error("crop", &CaptchaError::Decode("not an image".into()));
        assert_eq!(bad.code, PARAM_ERROR);

        let engine = Envelope::from_error("select", &CaptchaError::Engine("model crashed".into()));
        assert_eq!(engine.code, SERVICE_ERROR);
        assert!(engine.msg.starts_with("select failed"));

        let nothing = Envelope::from_error("slide match", &CaptchaError::NoResult("slide match"));
        assert_eq!(nothing.code, SERVICE_ERROR);
    }
}
