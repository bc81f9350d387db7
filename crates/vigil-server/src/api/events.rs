use crate::api::{error_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use vigil_common::types::{Action, Event, Severity};
use vigil_ingest::IngestError;

/// Incoming alert event.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestEventBody {
    /// Namespace the event belongs to.
    pub tenant_id: String,
    /// Human-readable description. May be empty for resolve events.
    #[serde(default)]
    pub summary: String,
    /// "high", "medium", or "low".
    pub severity: String,
    /// "trigger" or "resolve".
    pub action: String,
    /// Classification/category. May be empty for resolve events.
    #[serde(default)]
    pub class: String,
    /// Deduplication key identifying the alert.
    pub dedup_key: String,
}

/// Acknowledgment that an event was accepted for asynchronous processing.
#[derive(Serialize, ToSchema)]
struct EventAccepted {
    status: String,
    dedup_key: String,
}

/// Submit an alert event.
///
/// The event is validated, enriched, and published to the queue; processing
/// (grouping, lifecycle transitions) happens asynchronously.
#[utoipa::path(
    post,
    path = "/v1/events",
    tag = "Events",
    request_body = IngestEventBody,
    responses(
        (status = 202, description = "Event accepted for processing"),
        (status = 404, description = "Unknown tenant or grouping rule", body = ApiError),
        (status = 422, description = "Event failed validation", body = ApiError),
        (status = 500, description = "Queue unavailable", body = ApiError)
    )
)]
pub async fn ingest_event(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(body): Json<IngestEventBody>,
) -> impl IntoResponse {
    let severity: Severity = match body.severity.parse() {
        Ok(severity) => severity,
        Err(_) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                &trace_id,
                "validation_failed",
                "severity must be 'high', 'medium', or 'low'",
            );
        }
    };
    let action: Action = match body.action.parse() {
        Ok(action) => action,
        Err(_) => {
            return error_response(
                StatusCode::UNPROCESSABLE_ENTITY,
                &trace_id,
                "validation_failed",
                "action must be 'trigger' or 'resolve'",
            );
        }
    };

    let event = Event {
        tenant_id: body.tenant_id,
        summary: body.summary,
        severity,
        action,
        class: body.class,
        dedup_key: body.dedup_key.clone(),
    };

    match state.ingest.ingest_event(event).await {
        Ok(()) => success_response(
            StatusCode::ACCEPTED,
            &trace_id,
            EventAccepted {
                status: "accepted".to_string(),
                dedup_key: body.dedup_key,
            },
        ),
        Err(IngestError::InvalidEvent(error)) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &trace_id,
            "validation_failed",
            &error.to_string(),
        ),
        Err(IngestError::TenantNotFound(id)) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("tenant not found: {id}"),
        ),
        Err(IngestError::GroupingRuleNotFound(id)) => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("grouping rule not found: {id}"),
        ),
        Err(IngestError::PublishFailed(error)) => {
            tracing::error!(trace_id = %trace_id.0, error = %error, "failed to publish event");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "queue_error",
                "failed to enqueue event",
            )
        }
        Err(error) => {
            tracing::error!(trace_id = %trace_id.0, error = %error, "failed to ingest event");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "internal_error",
                "failed to ingest event",
            )
        }
    }
}
