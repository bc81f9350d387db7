use crate::api::pagination::PaginationParams;
use crate::api::{error_response, success_paginated_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use vigil_common::types::{Alert, AlertFilter, AlertStatus, AlertType};

/// Alert record.
#[derive(Serialize, ToSchema)]
pub struct AlertResponse {
    /// Durable identifier.
    pub id: String,
    /// Deduplication key (business identifier).
    pub dedup_key: String,
    pub tenant_id: String,
    pub summary: String,
    pub severity: String,
    pub class: String,
    /// "parent" or "child".
    #[serde(rename = "type")]
    pub alert_type: String,
    /// "active" or "resolved".
    pub status: String,
    /// Parent reference; only set for children.
    pub parent_dedup_key: Option<String>,
    pub child_count: i64,
    pub resolve_requested: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<Alert> for AlertResponse {
    fn from(alert: Alert) -> Self {
        Self {
            id: alert.id,
            dedup_key: alert.dedup_key,
            tenant_id: alert.tenant_id,
            summary: alert.summary,
            severity: alert.severity.to_string(),
            class: alert.class,
            alert_type: alert.alert_type.to_string(),
            status: alert.status.to_string(),
            parent_dedup_key: alert.parent_dedup_key,
            child_count: alert.child_count,
            resolve_requested: alert.resolve_requested,
            created_at: alert.created_at,
            updated_at: alert.updated_at,
            resolved_at: alert.resolved_at,
        }
    }
}

/// Alert list query parameters.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAlertsParams {
    /// Filter by tenant.
    #[param(required = false)]
    tenant_id: Option<String>,
    /// Filter by status ("active" / "resolved").
    #[param(required = false)]
    status: Option<String>,
    /// Filter by type ("parent" / "child").
    #[param(required = false)]
    #[serde(rename = "type")]
    alert_type: Option<String>,
    #[param(required = false)]
    limit: Option<u64>,
    #[param(required = false)]
    offset: Option<u64>,
}

/// List alerts, newest first.
#[utoipa::path(
    get,
    path = "/v1/alerts",
    tag = "Alerts",
    params(ListAlertsParams),
    responses(
        (status = 200, description = "Alert page", body = Vec<AlertResponse>),
        (status = 400, description = "Bad filter value", body = ApiError)
    )
)]
pub async fn list_alerts(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<ListAlertsParams>,
) -> impl IntoResponse {
    let status = match params.status.as_deref() {
        None => None,
        Some("active") => Some(AlertStatus::Active),
        Some("resolved") => Some(AlertStatus::Resolved),
        Some(other) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                &format!("unknown status filter: {other}"),
            );
        }
    };
    let alert_type = match params.alert_type.as_deref() {
        None => None,
        Some("parent") => Some(AlertType::Parent),
        Some("child") => Some(AlertType::Child),
        Some(other) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                &format!("unknown type filter: {other}"),
            );
        }
    };

    let paging = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let filter = AlertFilter {
        tenant_id: params.tenant_id,
        status,
        alert_type,
        limit: paging.limit(),
        offset: paging.offset(),
    };

    // Total is counted with paging stripped from the same filter.
    let total = match state
        .alerts
        .list(&AlertFilter {
            limit: 0,
            offset: 0,
            ..filter.clone()
        })
        .await
    {
        Ok(all) => all.len() as u64,
        Err(error) => {
            tracing::error!(error = %error, "failed to count alerts");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "failed to list alerts",
            );
        }
    };

    match state.alerts.list(&filter).await {
        Ok(alerts) => {
            let items: Vec<AlertResponse> = alerts.into_iter().map(AlertResponse::from).collect();
            success_paginated_response(
                StatusCode::OK,
                &trace_id,
                items,
                total,
                paging.limit(),
                paging.offset(),
            )
        }
        Err(error) => {
            tracing::error!(error = %error, "failed to list alerts");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "failed to list alerts",
            )
        }
    }
}

/// Fetch one alert by its dedup key.
#[utoipa::path(
    get,
    path = "/v1/alerts/{dedup_key}",
    tag = "Alerts",
    params(("dedup_key" = String, Path, description = "Alert dedup key")),
    responses(
        (status = 200, description = "Alert", body = AlertResponse),
        (status = 404, description = "Unknown alert", body = ApiError)
    )
)]
pub async fn get_alert(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(dedup_key): Path<String>,
) -> impl IntoResponse {
    match state.alerts.get_by_dedup_key(&dedup_key).await {
        Ok(alert) => success_response(StatusCode::OK, &trace_id, AlertResponse::from(alert)),
        Err(error) if error.is_not_found() => error_response(
            StatusCode::NOT_FOUND,
            &trace_id,
            "not_found",
            &format!("alert not found: {dedup_key}"),
        ),
        Err(error) => {
            tracing::error!(error = %error, "failed to fetch alert");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "failed to fetch alert",
            )
        }
    }
}

/// List the children grouped under a parent alert.
#[utoipa::path(
    get,
    path = "/v1/alerts/{dedup_key}/children",
    tag = "Alerts",
    params(("dedup_key" = String, Path, description = "Parent dedup key")),
    responses(
        (status = 200, description = "Child alerts", body = Vec<AlertResponse>),
        (status = 400, description = "Alert is not a parent", body = ApiError),
        (status = 404, description = "Unknown alert", body = ApiError)
    )
)]
pub async fn list_alert_children(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(dedup_key): Path<String>,
) -> impl IntoResponse {
    let parent = match state.alerts.get_by_dedup_key(&dedup_key).await {
        Ok(parent) => parent,
        Err(error) if error.is_not_found() => {
            return error_response(
                StatusCode::NOT_FOUND,
                &trace_id,
                "not_found",
                &format!("alert not found: {dedup_key}"),
            );
        }
        Err(error) => {
            tracing::error!(error = %error, "failed to fetch alert");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "failed to fetch alert",
            );
        }
    };
    if !parent.is_parent() {
        return error_response(
            StatusCode::BAD_REQUEST,
            &trace_id,
            "bad_request",
            "alert is not a parent alert",
        );
    }

    match state.alerts.children_of(&dedup_key).await {
        Ok(children) => {
            let items: Vec<AlertResponse> =
                children.into_iter().map(AlertResponse::from).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(error) => {
            tracing::error!(error = %error, "failed to list children");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "failed to list children",
            )
        }
    }
}
