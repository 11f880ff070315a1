//! Route definitions for the auth service API
//!
//! This module organizes all API routes and applies middleware.

use crate::auth::enforce_gates;
use crate::state::AppState;
use axum::{
    http::{header, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::time::Duration;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

mod auth;
mod health;
mod users;


pub use auth::{auth_routes, session_routes};
pub use users::user_routes;

/// Create the main application router with all middleware
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let timeout = Duration::from_secs(server.request_timeout_secs);
    let max_concurrent = server.max_concurrent_requests;

    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .nest("/v1", api_routes(&state))
        // Apply middleware layers
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(ConcurrencyLimitLayer::new(max_concurrent))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// API v1 routes
///
/// Each protected group carries its own gate pipeline as a route layer, so
/// unmatched paths still fall through to a plain 404.
fn api_routes(state: &AppState) -> Router<AppState> {
    let authenticated = auth::session_routes()
        .route_layer(from_fn_with_state(state.authenticated.clone(), enforce_gates));
    let admin = users::user_routes()
        .route_layer(from_fn_with_state(state.admin.clone(), enforce_gates));

    Router::new()
        .route("/", get(|| async { "Auth Service API v1" }))
        .merge(auth::auth_routes())
        .merge(authenticated)
        .nest("/user", admin)
}
