//! Authentication API Endpoints
//! Mission: login, refresh, logout and token introspection over HTTP

use crate::auth::{
    error::AuthError,
    jwt::TokenPair,
    models::{
        Identity, LoginRequest, LogoutRequest, RefreshRequest, TokenPairResponse,
        ValidateResponse,
    },
    service::AuthService,
};
use axum::{extract::State, http::StatusCode, Extension, Json};

fn pair_response(auth: &AuthService, pair: TokenPair) -> Json<TokenPairResponse> {
    Json(TokenPairResponse {
        access_token: pair.access.token,
        refresh_token: pair.refresh.token,
        expires_in: auth.jwt().access_ttl_secs(),
    })
}

/// Login endpoint - POST /auth/login
pub async fn login(
    State(auth): State<AuthService>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, AuthError> {
    let pair = auth.login(&payload.username, &payload.password).await?;
    Ok(pair_response(&auth, pair))
}

/// Refresh endpoint - POST /auth/refresh
pub async fn refresh(
    State(auth): State<AuthService>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPairResponse>, AuthError> {
    let pair = auth.refresh(&payload.refresh_token)?;
    Ok(pair_response(&auth, pair))
}

/// Logout endpoint - POST /auth/logout
/// The client discards its tokens; a supplied refresh token is denylisted.
pub async fn logout(
    State(auth): State<AuthService>,
    payload: Option<Json<LogoutRequest>>,
) -> StatusCode {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    auth.logout(payload.refresh_token.as_deref());
    StatusCode::NO_CONTENT
}

/// Token introspection - GET /auth/validate (behind the admin guard)
pub async fn validate(Extension(identity): Extension<Identity>) -> Json<ValidateResponse> {
    Json(ValidateResponse { identity })
}
