//! Authentication middleware
//!
//! Applies a [`GatePipeline`] to a group of routes and hands the resulting
//! [`Authenticated`] value to handlers through the [`AuthUser`] extractor.

use super::gate::{Authenticated, GatePipeline};
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

/// Authenticated caller, as admitted by the route group's gates
///
/// Only available on routes layered with [`enforce_gates`]; anywhere else
/// extraction fails with `Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: String,
}

impl From<Authenticated> for AuthUser {
    fn from(authenticated: Authenticated) -> Self {
        Self {
            user_id: authenticated.claims.user_id,
            role: authenticated.claims.role,
        }
    }
}

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Authenticated>()
            .cloned()
            .map(AuthUser::from)
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))
    }
}

/// Middleware running the pipeline before the handler
///
/// ```ignore
/// router.route_layer(axum::middleware::from_fn_with_state(pipeline, enforce_gates))
/// ```
pub async fn enforce_gates(
    State(pipeline): State<GatePipeline>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authenticated = pipeline.admit(request.headers())?;
    request.extensions_mut().insert(authenticated);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::gate::AdminOnly;
    use crate::auth::jwt::{TokenCodec, TokenKind};
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use chrono::Duration;
    use tower::ServiceExt;

    fn codec() -> TokenCodec {
        TokenCodec::new(TokenKind::Access, "middleware-access-secret")
    }

    fn app() -> Router {
        let admin = GatePipeline::new(codec()).with_gate(AdminOnly);
        Router::new()
            .route(
                "/admin",
                get(|user: AuthUser| async move { format!("hello {}", user.user_id) }),
            )
            .route_layer(from_fn_with_state(admin, enforce_gates))
            .route("/open", get(|user: AuthUser| async move { user.role }))
    }

    async fn call(uri: &str, token: Option<&str>) -> StatusCode {
        let mut builder = HttpRequest::builder().uri(uri).method("GET");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_admin_route_statuses() {
        let admin = codec().sign(1, "admin", Duration::minutes(5)).unwrap();
        let user = codec().sign(2, "user", Duration::minutes(5)).unwrap();

        assert_eq!(call("/admin", Some(&admin)).await, StatusCode::OK);
        assert_eq!(call("/admin", Some(&user)).await, StatusCode::NOT_FOUND);
        assert_eq!(call("/admin", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(call("/admin", Some("not.a.token")).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_extractor_without_gates_is_unauthorized() {
        let admin = codec().sign(1, "admin", Duration::minutes(5)).unwrap();
        assert_eq!(call("/open", Some(&admin)).await, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_auth_user_from_authenticated() {
        let claims = codec()
            .parse(&codec().sign(9, "combined", Duration::minutes(1)).unwrap())
            .unwrap();
        let user = AuthUser::from(Authenticated { claims });

        assert_eq!(user.user_id, 9);
        assert_eq!(user.role, "combined");
    }
}
