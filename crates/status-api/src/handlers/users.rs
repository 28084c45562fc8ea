//! Public user handlers
//!
//! Author: hephaex@gmail.com

use super::status::{StatusListQuery, StatusListResponse, StatusResponse};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use status_core::User;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Public view of an identity
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub uri: String,
}

impl From<&User> for UserPublic {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            uri: format!("/api/user/{}/", user.username),
        }
    }
}

async fn find_user(state: &AppState, username: &str) -> Result<User, AppError> {
    state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound("Not found.".to_string()))
}

/// Get a user by username (case-insensitive)
#[utoipa::path(
    get,
    path = "/api/user/{username}/",
    tag = "users",
    params(("username" = String, Path, description = "Username")),
    responses(
        (status = 200, description = "User", body = UserPublic),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<UserPublic>, AppError> {
    let user = find_user(&state, &username).await?;
    Ok(Json(UserPublic::from(&user)))
}

/// List statuses authored by a user, newest first
#[utoipa::path(
    get,
    path = "/api/user/{username}/status/",
    tag = "users",
    params(
        ("username" = String, Path, description = "Username"),
        StatusListQuery
    ),
    responses(
        (status = 200, description = "Statuses", body = StatusListResponse),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn list_user_statuses(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(query): Query<StatusListQuery>,
) -> Result<Json<StatusListResponse>, AppError> {
    let user = find_user(&state, &username).await?;
    let filter = query.to_filter(Some(user.id));
    let statuses = state.statuses.list_statuses(&filter).await?;

    Ok(Json(StatusListResponse {
        results: statuses.into_iter().map(StatusResponse::from).collect(),
        limit: filter.limit,
        offset: filter.offset,
    }))
}
