use crate::api::{error_response, success_empty_response, success_response, ApiError};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use vigil_common::types::{
    CreateGroupingRuleRequest, GroupingRule, UpdateGroupingRuleRequest,
};
use vigil_store::error::StoreError;

/// Grouping rule record.
#[derive(Serialize, ToSchema)]
pub struct GroupingRuleResponse {
    pub id: String,
    pub name: String,
    /// Event field whose value defines the group ("class", "severity",
    /// "tenant_id"); unrecognized keys group everything together.
    pub grouping_key: String,
    /// How long a parent stays open as a grouping target, in minutes.
    pub time_window_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GroupingRule> for GroupingRuleResponse {
    fn from(rule: GroupingRule) -> Self {
        Self {
            id: rule.id,
            name: rule.name,
            grouping_key: rule.grouping_key,
            time_window_minutes: rule.time_window_minutes,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

/// Grouping rule create/update payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GroupingRuleBody {
    pub name: String,
    pub grouping_key: String,
    pub time_window_minutes: u32,
}

fn store_error_response(trace_id: &str, error: StoreError) -> axum::response::Response {
    match error {
        StoreError::NotFound { .. } => error_response(
            StatusCode::NOT_FOUND,
            trace_id,
            "not_found",
            "grouping rule not found",
        ),
        StoreError::AlreadyExists { .. } => error_response(
            StatusCode::CONFLICT,
            trace_id,
            "conflict",
            "grouping rule already exists",
        ),
        error => {
            tracing::error!(error = %error, "storage failure");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                trace_id,
                "storage_error",
                "storage failure",
            )
        }
    }
}

/// List grouping rules.
#[utoipa::path(
    get,
    path = "/v1/grouping-rules",
    tag = "GroupingRules",
    responses(
        (status = 200, description = "All grouping rules", body = Vec<GroupingRuleResponse>)
    )
)]
pub async fn list_grouping_rules(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.rules.list().await {
        Ok(rules) => {
            let items: Vec<GroupingRuleResponse> =
                rules.into_iter().map(GroupingRuleResponse::from).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(error) => store_error_response(&trace_id, error),
    }
}

/// Create a grouping rule.
#[utoipa::path(
    post,
    path = "/v1/grouping-rules",
    tag = "GroupingRules",
    request_body = GroupingRuleBody,
    responses(
        (status = 201, description = "Grouping rule created", body = GroupingRuleResponse),
        (status = 422, description = "Validation failed", body = ApiError)
    )
)]
pub async fn create_grouping_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(body): Json<GroupingRuleBody>,
) -> impl IntoResponse {
    let request = CreateGroupingRuleRequest {
        name: body.name,
        grouping_key: body.grouping_key,
        time_window_minutes: body.time_window_minutes,
    };
    if let Err(error) = request.validate() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &trace_id,
            "validation_failed",
            &error.to_string(),
        );
    }

    let rule = request.into_rule(vigil_common::id::next_id());
    match state.rules.create(&rule).await {
        Ok(()) => success_response(
            StatusCode::CREATED,
            &trace_id,
            GroupingRuleResponse::from(rule),
        ),
        Err(error) => store_error_response(&trace_id, error),
    }
}

/// Fetch a grouping rule.
#[utoipa::path(
    get,
    path = "/v1/grouping-rules/{id}",
    tag = "GroupingRules",
    params(("id" = String, Path, description = "Grouping rule ID")),
    responses(
        (status = 200, description = "Grouping rule", body = GroupingRuleResponse),
        (status = 404, description = "Unknown grouping rule", body = ApiError)
    )
)]
pub async fn get_grouping_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.rules.get_by_id(&id).await {
        Ok(rule) => success_response(StatusCode::OK, &trace_id, GroupingRuleResponse::from(rule)),
        Err(error) => store_error_response(&trace_id, error),
    }
}

/// Update a grouping rule.
///
/// Changing the key or window affects only future grouping decisions; open
/// parent windows keep the TTL they were created with.
#[utoipa::path(
    put,
    path = "/v1/grouping-rules/{id}",
    tag = "GroupingRules",
    params(("id" = String, Path, description = "Grouping rule ID")),
    request_body = GroupingRuleBody,
    responses(
        (status = 200, description = "Grouping rule updated", body = GroupingRuleResponse),
        (status = 404, description = "Unknown grouping rule", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    )
)]
pub async fn update_grouping_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<GroupingRuleBody>,
) -> impl IntoResponse {
    let request = UpdateGroupingRuleRequest {
        name: body.name,
        grouping_key: body.grouping_key,
        time_window_minutes: body.time_window_minutes,
    };
    if let Err(error) = request.validate() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &trace_id,
            "validation_failed",
            &error.to_string(),
        );
    }

    let mut rule = match state.rules.get_by_id(&id).await {
        Ok(rule) => rule,
        Err(error) => return store_error_response(&trace_id, error),
    };
    request.apply_to(&mut rule);

    match state.rules.update(&rule).await {
        Ok(()) => success_response(StatusCode::OK, &trace_id, GroupingRuleResponse::from(rule)),
        Err(error) => store_error_response(&trace_id, error),
    }
}

/// Delete a grouping rule.
#[utoipa::path(
    delete,
    path = "/v1/grouping-rules/{id}",
    tag = "GroupingRules",
    params(("id" = String, Path, description = "Grouping rule ID")),
    responses(
        (status = 200, description = "Grouping rule deleted"),
        (status = 404, description = "Unknown grouping rule", body = ApiError)
    )
)]
pub async fn delete_grouping_rule(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.rules.delete(&id).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "deleted"),
        Err(error) => store_error_response(&trace_id, error),
    }
}
