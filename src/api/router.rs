use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::api::state::AppState;

/// Largest accepted request body. Base64 inflates images by a third, so this
/// leaves room for background images of several megabytes.
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Build the captcha API router
pub fn captcha_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::health))
        .route("/capcode", post(handlers::capcode))
        .route("/slideComparison", post(handlers::slide_comparison))
        .route("/classification", post(handlers::classification))
        .route("/detection", post(handlers::detection))
        .route("/calculate", post(handlers::calculate))
        .route("/crop", post(handlers::crop))
        .route("/select", post(handlers::select))
        .route("/set_ranges", post(handlers::set_ranges))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
