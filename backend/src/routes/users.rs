//! User administration routes
//!
//! Mounted under `/v1/user` behind the admin gate pipeline.

use crate::error::{ApiError, ApiResult};
use crate::services::UserService;
use crate::state::AppState;
use auth_service_shared::types::{PageQuery, UpdateUserRequest, UserProfile};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/all", get(list_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

/// Ids arrive as raw strings so a non-numeric id is a 400, not a routing miss
fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid user id: {}", raw)))
}

/// GET /v1/user/all?offset=&limit=
async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    let users = UserService::list(state.store(), query).await?;
    Ok(Json(users))
}

/// GET /v1/user/{id}
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    let profile = UserService::get_profile(state.store(), parse_id(&id)?).await?;
    Ok(Json(profile))
}

/// PUT /v1/user/{id}
async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserProfile>> {
    let profile = UserService::update(state.store(), parse_id(&id)?, req).await?;
    Ok(Json(profile))
}

/// DELETE /v1/user/{id}
async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    UserService::delete(state.store(), parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
