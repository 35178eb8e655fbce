//! Auth error taxonomy
//! Mission: Stable machine-readable codes for every way admission can fail

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Terminal, per-request authentication and authorization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    InvalidCredentials,
    InvalidSignature,
    Expired,
    WrongTokenType,
    MalformedClaims,
    MissingToken,
    RoleForbidden,
    Revoked,
    UpstreamStoreUnavailable,
    InternalError,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "InvalidCredentials",
            AuthError::InvalidSignature => "InvalidSignature",
            AuthError::Expired => "Expired",
            AuthError::WrongTokenType => "WrongTokenType",
            AuthError::MalformedClaims => "MalformedClaims",
            AuthError::MissingToken => "MissingToken",
            AuthError::RoleForbidden => "RoleForbidden",
            AuthError::Revoked => "Revoked",
            AuthError::UpstreamStoreUnavailable => "UpstreamStoreUnavailable",
            AuthError::InternalError => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::RoleForbidden => StatusCode::FORBIDDEN,
            AuthError::UpstreamStoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            AuthError::InvalidCredentials => "Invalid username or password",
            AuthError::InvalidSignature => "Token signature is invalid",
            AuthError::Expired => "Token has expired",
            AuthError::WrongTokenType => "Token type not accepted here",
            AuthError::MalformedClaims => "Token claims are malformed",
            AuthError::MissingToken => "Missing authorization token",
            AuthError::RoleForbidden => "Insufficient permissions",
            AuthError::Revoked => "Token has been revoked",
            AuthError::UpstreamStoreUnavailable => "Credential store unavailable",
            AuthError::InternalError => "Internal server error",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.code(),
            "message": self.message(),
        }));

        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_statuses() {
        assert_eq!(
            AuthError::MissingToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Expired.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::RoleForbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::UpstreamStoreUnavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_auth_error_body_carries_code() {
        let response = AuthError::WrongTokenType.into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "WrongTokenType");
    }
}
