use std::sync::{Arc, RwLock};

use crate::engine::Charset;
use crate::pipeline::{CaptchaPipeline, RequestContext};

/// Shared server state.
///
/// The default charset is the only mutable piece; requests snapshot it into
/// their own `RequestContext` so a later `set_ranges` never changes a request
/// that is already running.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<CaptchaPipeline>,
    default_charset: Arc<RwLock<Option<Charset>>>,
}

impl AppState {
    pub fn new(pipeline: CaptchaPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            default_charset: Arc::new(RwLock::new(None)),
        }
    }

    pub fn pipeline(&self) -> Arc<CaptchaPipeline> {
        self.pipeline.clone()
    }

    pub fn context(&self) -> RequestContext {
        let charset = self
            .default_charset
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        RequestContext::new().with_charset(charset)
    }

    pub fn set_default_charset(&self, charset: Option<Charset>) {
        *self
            .default_charset
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = charset;
    }
}
