//! Authentication Middleware
//! Mission: Protect API endpoints with JWT validation

use crate::auth::{jwt::JwtHandler, models::Principal, session};
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

/// Auth middleware that validates JWT tokens from the header or the session cookie
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = session::extract_token(req.headers()).ok_or(ApiError::MissingToken)?;

    let claims = jwt_handler.validate_token(&token)?;

    // A signed token with an unusable subject is still invalid
    let principal = Principal::from_claims(&claims).ok_or_else(|| {
        debug!("Token subject is not a user id: {}", claims.sub);
        ApiError::InvalidToken
    })?;

    // Handlers read the caller from extensions
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Extract the caller from a request (use after auth middleware)
pub fn extract_principal(req: &Request) -> Option<&Principal> {
    req.extensions().get::<Principal>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::Role;
    use axum::{
        body::Body,
        http::{header, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;
    use uuid::Uuid;

    const SECRET: &str = "middleware-test-secret-0123456789abcdef";

    fn app(jwt: Arc<JwtHandler>) -> Router {
        Router::new()
            .route(
                "/whoami",
                get(|Extension(principal): Extension<Principal>| async move {
                    principal.role.as_str().to_string()
                }),
            )
            .route_layer(middleware::from_fn_with_state(jwt, auth_middleware))
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let jwt = Arc::new(JwtHandler::new(SECRET, 3600).unwrap());
        let response = app(jwt)
            .oneshot(HttpRequest::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_forbidden() {
        let jwt = Arc::new(JwtHandler::new(SECRET, 3600).unwrap());
        let response = app(jwt)
            .oneshot(
                HttpRequest::get("/whoami")
                    .header(header::AUTHORIZATION, "Bearer not.a.token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_extract_principal_from_request() {
        let mut req = HttpRequest::new(Body::empty());
        assert!(extract_principal(&req).is_none());

        req.extensions_mut().insert(Principal {
            id: Uuid::new_v4(),
            name: "Test User".to_string(),
            role: Role::Patient,
        });

        let extracted = extract_principal(&req).unwrap();
        assert_eq!(extracted.role, Role::Patient);
        assert_eq!(extracted.name, "Test User");
    }
}
