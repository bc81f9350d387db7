use crate::api::success_response;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

/// Health check response.
#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// Service version.
    version: String,
    /// Seconds since startup.
    uptime_secs: i64,
    /// Storage status.
    storage_status: String,
}

/// Service health. No authentication.
#[utoipa::path(
    get,
    path = "/v1/health",
    tag = "System",
    responses(
        (status = 200, description = "Service health", body = HealthResponse)
    )
)]
pub async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let uptime = (Utc::now() - state.start_time).num_seconds();
    success_response(
        StatusCode::OK,
        &trace_id,
        HealthResponse {
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: uptime,
            storage_status: "ok".to_string(),
        },
    )
}
