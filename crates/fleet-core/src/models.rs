//! JSON bodies exchanged between devices, the metrics server and the CLI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/devices/:device_id/heartbeat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub sent_at: DateTime<Utc>,
}

/// Body of `POST /api/v1/devices/:device_id/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadStatsRequest {
    pub sent_at: DateTime<Utc>,
    /// Upload duration in nanoseconds
    pub upload_time: i64,
}

/// Body of a successful `GET /api/v1/devices/:device_id/stats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatsResponse {
    /// Duration string such as `"5m10s"`
    pub avg_upload_time: String,
    /// Percentage, may exceed 100
    pub uptime: f64,
}

/// Error body for every non-2xx API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub msg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub devices: usize,
    pub uptime_seconds: u64,
}
