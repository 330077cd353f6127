use axum::extract::State;
use axum::Json;
use fleet_core::models::HealthResponse;

use crate::state::AppState;

pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        devices: state.registry().len(),
        uptime_seconds: state.uptime_secs(),
    })
}
