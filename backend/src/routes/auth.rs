//! Authentication routes
//!
//! Registration, login and token refresh are public; `/me` sits behind the
//! authenticated gate pipeline.

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::services::UserService;
use crate::state::AppState;
use auth_service_shared::types::{
    AuthTokens, LoginRequest, RefreshTokenRequest, RegisterRequest, UserProfile,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

/// Public credential routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh_token))
}

/// Routes requiring any valid access token
pub fn session_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_profile))
}

/// Register a new user
///
/// POST /v1/register
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let profile = UserService::register(state.store(), req).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Login with username and password
///
/// POST /v1/login
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthTokens>> {
    let tokens =
        UserService::login(state.store(), state.sessions(), &req.username, &req.password).await?;
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new pair
///
/// POST /v1/refresh
async fn refresh_token(
    State(state): State<AppState>,
    Json(req): Json<RefreshTokenRequest>,
) -> ApiResult<Json<AuthTokens>> {
    let tokens = UserService::refresh(state.store(), state.sessions(), &req.refresh_token).await?;
    Ok(Json(tokens))
}

/// Get current user profile
///
/// GET /v1/me
async fn get_profile(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let profile = UserService::get_profile(state.store(), auth_user.user_id).await?;
    Ok(Json(profile))
}
