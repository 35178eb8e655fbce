//! Authentication Middleware
//! Mission: Gate admin routes behind a valid access token and a role check

use crate::auth::{
    error::AuthError,
    jwt::JwtHandler,
    models::{Identity, TokenType, UserRole},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use std::sync::Arc;
use tracing::warn;

/// Route guard configuration: who signs tokens and which role is required
#[derive(Clone)]
pub struct RouteGuard {
    jwt: Arc<JwtHandler>,
    required_role: Option<UserRole>,
}

impl RouteGuard {
    pub fn new(jwt: Arc<JwtHandler>, required_role: Option<UserRole>) -> Self {
        Self { jwt, required_role }
    }

    pub fn admin(jwt: Arc<JwtHandler>) -> Self {
        Self::new(jwt, Some(UserRole::Admin))
    }

    /// Authenticate (401 family) then authorize (403)
    pub fn check(&self, req: &Request) -> Result<Identity, AuthError> {
        let bearer = req
            .headers()
            .typed_get::<Authorization<Bearer>>()
            .ok_or(AuthError::MissingToken)?;

        let identity = self.jwt.validate(bearer.token(), TokenType::Access)?;

        if let Some(required) = self.required_role {
            if identity.role != required {
                warn!(
                    username = %identity.username,
                    role = identity.role.as_str(),
                    required = required.as_str(),
                    path = %req.uri().path(),
                    "Role forbidden"
                );
                return Err(AuthError::RoleForbidden);
            }
        }

        Ok(identity)
    }
}

/// Auth middleware that validates the bearer access token
pub async fn auth_middleware(
    State(guard): State<RouteGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = guard.check(&req)?;

    // Add identity to request extensions so handlers can access it
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Extract identity from request (use after auth middleware)
pub fn extract_identity(req: &Request) -> Option<&Identity> {
    req.extensions().get::<Identity>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    const SECRET: &str = "guard-test-secret";

    fn app() -> Router {
        let jwt = Arc::new(JwtHandler::new(SECRET));
        Router::new()
            .route(
                "/secret",
                get(|Extension(identity): Extension<Identity>| async move { identity.username }),
            )
            .route_layer(middleware::from_fn_with_state(
                RouteGuard::admin(jwt),
                auth_middleware,
            ))
    }

    fn token_for(role: UserRole, token_type: TokenType) -> String {
        let identity = Identity {
            username: "someone".to_string(),
            role,
        };
        JwtHandler::new(SECRET)
            .issue_at(&identity, token_type, chrono::Utc::now().timestamp())
            .unwrap()
            .token
    }

    async fn call(auth: Option<String>) -> (StatusCode, serde_json::Value) {
        let mut builder = HttpRequest::builder().uri("/secret");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_missing_header_is_401_missing_token() {
        let (status, body) = call(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "MissingToken");
    }

    #[tokio::test]
    async fn test_non_bearer_scheme_is_missing_token() {
        let (status, body) = call(Some("Basic YWRtaW46YWRtaW4=".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "MissingToken");
    }

    #[tokio::test]
    async fn test_forged_token_is_invalid_signature() {
        let (status, body) = call(Some("Bearer not.a.jwt".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "InvalidSignature");
    }

    #[tokio::test]
    async fn test_refresh_token_is_wrong_type() {
        let token = token_for(UserRole::Admin, TokenType::Refresh);
        let (status, body) = call(Some(format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "WrongTokenType");
    }

    #[tokio::test]
    async fn test_staff_token_is_403() {
        let token = token_for(UserRole::Staff, TokenType::Access);
        let (status, body) = call(Some(format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "RoleForbidden");
    }

    #[tokio::test]
    async fn test_admin_token_reaches_handler() {
        let token = token_for(UserRole::Admin, TokenType::Access);
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/secret")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"someone");
    }

    #[test]
    fn test_extract_identity_from_request() {
        let mut req = HttpRequest::new(Body::empty());
        assert!(extract_identity(&req).is_none());

        req.extensions_mut().insert(Identity {
            username: "test".to_string(),
            role: UserRole::Admin,
        });
        assert_eq!(extract_identity(&req).unwrap().username, "test");
    }
}
