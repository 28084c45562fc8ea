//! Status API handlers
//!
//! Author: hephaex@gmail.com

use crate::audit::{audit_log, AuditEvent};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extract::ApiJson;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use status_core::repository::DEFAULT_PAGE_SIZE;
use status_core::validation::{validate_status_entry, StatusEntry};
use status_core::{Status, StatusFilter, ValidationErrors};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Upper bound on `limit`
pub const MAX_PAGE_SIZE: i64 = 100;

/// Status creation request
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CreateStatusRequest {
    /// Owner; defaults to the caller and must equal the caller when given
    pub user: Option<Uuid>,
    /// Text body
    pub content: Option<String>,
    /// Image reference (upload path or URL)
    pub image: Option<String>,
}

/// Status representation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub id: Uuid,
    /// Owner id
    pub user: Uuid,
    pub content: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub uri: String,
}

impl From<Status> for StatusResponse {
    fn from(status: Status) -> Self {
        Self {
            uri: format!("/api/status/{}/", status.id),
            id: status.id,
            user: status.user_id,
            content: status.content,
            image: status.image,
            created_at: status.created_at,
        }
    }
}

/// Page of statuses, newest first
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusListResponse {
    pub results: Vec<StatusResponse>,
    pub limit: i64,
    pub offset: i64,
}

/// Listing parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StatusListQuery {
    /// Case-insensitive content search
    pub q: Option<String>,
    /// Page size (1-100, default 20)
    pub limit: Option<i64>,
    /// Number of statuses to skip
    pub offset: Option<i64>,
}

impl StatusListQuery {
    /// Repository filter with paging clamped to sane bounds
    pub fn to_filter(&self, user_id: Option<Uuid>) -> StatusFilter {
        StatusFilter {
            user_id,
            query: self.q.clone().filter(|q| !q.is_empty()),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.unwrap_or(0).max(0),
        }
    }
}

/// Post a status
///
/// Content or image is required; the status is owned by the caller.
#[utoipa::path(
    post,
    path = "/api/status/",
    tag = "status",
    request_body = CreateStatusRequest,
    responses(
        (status = 201, description = "Status created", body = StatusResponse),
        (status = 400, description = "Content or image is required."),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_status(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    ApiJson(request): ApiJson<CreateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    if request.user.is_some_and(|owner| owner != caller.user_id) {
        return Err(ValidationErrors::field("user", "You may only post statuses as yourself.").into());
    }

    let entry = validate_status_entry(StatusEntry {
        content: request.content,
        image: request.image,
    })?;

    let status = Status::new(caller.user_id, entry);
    state.statuses.create_status(&status).await?;

    audit_log(&AuditEvent::StatusCreated {
        user_id: caller.user_id,
        status_id: status.id,
        has_content: status.content.is_some(),
        has_image: status.image.is_some(),
    });

    Ok((StatusCode::CREATED, Json(StatusResponse::from(status))))
}

/// List statuses, newest first
#[utoipa::path(
    get,
    path = "/api/status/",
    tag = "status",
    params(StatusListQuery),
    responses(
        (status = 200, description = "Statuses", body = StatusListResponse),
    )
)]
pub async fn list_statuses(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatusListQuery>,
) -> Result<Json<StatusListResponse>, AppError> {
    let filter = query.to_filter(None);
    let statuses = state.statuses.list_statuses(&filter).await?;

    Ok(Json(StatusListResponse {
        results: statuses.into_iter().map(StatusResponse::from).collect(),
        limit: filter.limit,
        offset: filter.offset,
    }))
}

/// Get a status by id
#[utoipa::path(
    get,
    path = "/api/status/{id}/",
    tag = "status",
    params(("id" = Uuid, Path, description = "Status id")),
    responses(
        (status = 200, description = "Status", body = StatusResponse),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusResponse>, AppError> {
    let status = state
        .statuses
        .get_status(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Not found.".to_string()))?;

    Ok(Json(StatusResponse::from(status)))
}
