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
    CreateTenantRequest, NotificationConfig, Tenant, UpdateTenantRequest,
};
use vigil_store::error::StoreError;

/// Webhook settings.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct NotificationConfigBody {
    #[serde(default)]
    pub webhook_url: String,
}

/// Tenant record.
#[derive(Serialize, ToSchema)]
pub struct TenantResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub grouping_rule_id: String,
    pub notification_config: NotificationConfigBody,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tenant> for TenantResponse {
    fn from(tenant: Tenant) -> Self {
        Self {
            id: tenant.id,
            name: tenant.name,
            description: tenant.description,
            grouping_rule_id: tenant.grouping_rule_id,
            notification_config: NotificationConfigBody {
                webhook_url: tenant.notification_config.webhook_url,
            },
            created_at: tenant.created_at,
            updated_at: tenant.updated_at,
        }
    }
}

/// Tenant create/update payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TenantBody {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Grouping rule bound to this tenant (1:1).
    pub grouping_rule_id: String,
    #[serde(default)]
    pub notification_config: NotificationConfigBody,
}

fn store_error_response(trace_id: &str, error: StoreError, entity: &str) -> axum::response::Response {
    match error {
        StoreError::NotFound { .. } => error_response(
            StatusCode::NOT_FOUND,
            trace_id,
            "not_found",
            &format!("{entity} not found"),
        ),
        StoreError::AlreadyExists { .. } => error_response(
            StatusCode::CONFLICT,
            trace_id,
            "conflict",
            &format!("{entity} already exists"),
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

/// List tenants.
#[utoipa::path(
    get,
    path = "/v1/tenants",
    tag = "Tenants",
    responses(
        (status = 200, description = "All tenants", body = Vec<TenantResponse>)
    )
)]
pub async fn list_tenants(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.tenants.list().await {
        Ok(tenants) => {
            let items: Vec<TenantResponse> =
                tenants.into_iter().map(TenantResponse::from).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(error) => store_error_response(&trace_id, error, "tenant"),
    }
}

/// Create a tenant.
#[utoipa::path(
    post,
    path = "/v1/tenants",
    tag = "Tenants",
    request_body = TenantBody,
    responses(
        (status = 201, description = "Tenant created", body = TenantResponse),
        (status = 404, description = "Grouping rule does not exist", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    )
)]
pub async fn create_tenant(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(body): Json<TenantBody>,
) -> impl IntoResponse {
    let request = CreateTenantRequest {
        name: body.name,
        description: body.description,
        grouping_rule_id: body.grouping_rule_id,
        notification_config: NotificationConfig {
            webhook_url: body.notification_config.webhook_url,
        },
    };
    if let Err(error) = request.validate() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &trace_id,
            "validation_failed",
            &error.to_string(),
        );
    }

    // The 1:1 rule binding must point at a real rule.
    if let Err(error) = state.rules.get_by_id(&request.grouping_rule_id).await {
        return store_error_response(&trace_id, error, "grouping rule");
    }

    let tenant = request.into_tenant(vigil_common::id::next_id());
    match state.tenants.create(&tenant).await {
        Ok(()) => success_response(StatusCode::CREATED, &trace_id, TenantResponse::from(tenant)),
        Err(error) => store_error_response(&trace_id, error, "tenant"),
    }
}

/// Fetch a tenant.
#[utoipa::path(
    get,
    path = "/v1/tenants/{id}",
    tag = "Tenants",
    params(("id" = String, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant", body = TenantResponse),
        (status = 404, description = "Unknown tenant", body = ApiError)
    )
)]
pub async fn get_tenant(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.tenants.get_by_id(&id).await {
        Ok(tenant) => success_response(StatusCode::OK, &trace_id, TenantResponse::from(tenant)),
        Err(error) => store_error_response(&trace_id, error, "tenant"),
    }
}

/// Update a tenant.
#[utoipa::path(
    put,
    path = "/v1/tenants/{id}",
    tag = "Tenants",
    params(("id" = String, Path, description = "Tenant ID")),
    request_body = TenantBody,
    responses(
        (status = 200, description = "Tenant updated", body = TenantResponse),
        (status = 404, description = "Unknown tenant or grouping rule", body = ApiError),
        (status = 422, description = "Validation failed", body = ApiError)
    )
)]
pub async fn update_tenant(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TenantBody>,
) -> impl IntoResponse {
    let request = UpdateTenantRequest {
        name: body.name,
        description: body.description,
        grouping_rule_id: body.grouping_rule_id,
        notification_config: NotificationConfig {
            webhook_url: body.notification_config.webhook_url,
        },
    };
    if let Err(error) = request.validate() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &trace_id,
            "validation_failed",
            &error.to_string(),
        );
    }
    if let Err(error) = state.rules.get_by_id(&request.grouping_rule_id).await {
        return store_error_response(&trace_id, error, "grouping rule");
    }

    let mut tenant = match state.tenants.get_by_id(&id).await {
        Ok(tenant) => tenant,
        Err(error) => return store_error_response(&trace_id, error, "tenant"),
    };
    request.apply_to(&mut tenant);

    match state.tenants.update(&tenant).await {
        Ok(()) => success_response(StatusCode::OK, &trace_id, TenantResponse::from(tenant)),
        Err(error) => store_error_response(&trace_id, error, "tenant"),
    }
}

/// Delete a tenant.
#[utoipa::path(
    delete,
    path = "/v1/tenants/{id}",
    tag = "Tenants",
    params(("id" = String, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant deleted"),
        (status = 404, description = "Unknown tenant", body = ApiError)
    )
)]
pub async fn delete_tenant(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.tenants.delete(&id).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "deleted"),
        Err(error) => store_error_response(&trace_id, error, "tenant"),
    }
}
