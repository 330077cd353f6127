use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fleet_core::models::{DeviceStatsResponse, HeartbeatRequest, UploadStatsRequest};
use fleet_core::stats::{average_upload_duration, uptime};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// The body is validated before the device id, so a malformed body is a
/// 400 even for an unknown device.
fn parse_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|rejection| {
        debug!(error = %rejection.body_text(), "Rejected request body");
        ApiError::invalid_body()
    })
}

/// POST /api/v1/devices/:device_id/heartbeat
pub async fn post_heartbeat(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    payload: Result<Json<HeartbeatRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let req = parse_body(payload)?;
    state.registry().append_heartbeat(&device_id, req.sent_at)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/devices/:device_id/stats
pub async fn post_stats(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    payload: Result<Json<UploadStatsRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let req = parse_body(payload)?;
    state
        .registry()
        .append_upload_duration(&device_id, req.upload_time)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/devices/:device_id/stats. Answers 204 until the device reports
/// anything at all.
pub async fn get_stats(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Response, ApiError> {
    let snapshot = state.registry().snapshot(&device_id)?;
    if snapshot.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body = DeviceStatsResponse {
        avg_upload_time: average_upload_duration(&snapshot.upload_durations),
        uptime: uptime(&snapshot.heartbeats),
    };
    Ok(Json(body).into_response())
}
