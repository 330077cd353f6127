pub mod devices;
pub mod health;

use std::any::Any;

use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use fleet_core::API_PREFIX;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, Level};

use crate::error::ApiError;
use crate::state::AppState;

/// Turn a handler panic into the regular JSON error body.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(%detail, "Request handler panicked");
    ApiError::Internal("Internal server error".to_string()).into_response()
}

pub fn build_router(state: AppState) -> Router {
    let device_routes = Router::new()
        .route("/devices/:device_id/heartbeat", post(devices::post_heartbeat))
        .route(
            "/devices/:device_id/stats",
            post(devices::post_stats).get(devices::get_stats),
        );

    Router::new()
        .nest(API_PREFIX, device_routes)
        .route("/health", get(health::get_health))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}
