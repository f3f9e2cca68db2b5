//! Health endpoint.

use axum::extract::State;
use chrono::Utc;
use tracing::instrument;

use crate::models::{ApiResponse, HealthResponse};
use crate::state::AppState;

/// Health check endpoint.
///
/// Always returns 200 OK. Not rate limited.
///
/// # Response Body
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "status": "healthy",
///     "version": "0.1.0",
///     "uptimeSeconds": 3600,
///     "timestamp": "2024-01-15T10:30:00Z"
///   }
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> ApiResponse<HealthResponse> {
    ApiResponse::ok(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now(),
    })
}
