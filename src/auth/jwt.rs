//! JWT Token Handler
//! Mission: Mint access/refresh tokens and validate them without touching storage

use crate::auth::{
    error::AuthError,
    models::{Claims, Identity, IssuedToken, TokenType, UserRole},
};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 15;
pub const DEFAULT_REFRESH_TTL_HOURS: i64 = 24 * 7;

/// JWT Handler for token operations.
///
/// Validation is a pure function of token, clock and signing key, so one
/// handler is shared across all request tasks without locking.
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

/// Access and refresh token minted together
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

impl JwtHandler {
    /// Create a new JWT handler with secret key and default lifetimes
    pub fn new(secret: &str) -> Self {
        Self::with_ttls(
            secret,
            Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            Duration::hours(DEFAULT_REFRESH_TTL_HOURS),
        )
    }

    pub fn with_ttls(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        // exp, token_type and role are checked by hand so each failure keeps its own code
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access_token(&self, identity: &Identity) -> Result<IssuedToken> {
        self.issue_at(identity, TokenType::Access, Utc::now().timestamp())
    }

    pub fn issue_refresh_token(&self, identity: &Identity) -> Result<IssuedToken> {
        self.issue_at(identity, TokenType::Refresh, Utc::now().timestamp())
    }

    pub fn issue_pair(&self, identity: &Identity) -> Result<TokenPair> {
        let now = Utc::now().timestamp();
        Ok(TokenPair {
            access: self.issue_at(identity, TokenType::Access, now)?,
            refresh: self.issue_at(identity, TokenType::Refresh, now)?,
        })
    }

    /// Mint a token as if the clock read `now` (unix seconds)
    pub fn issue_at(
        &self,
        identity: &Identity,
        token_type: TokenType,
        now: i64,
    ) -> Result<IssuedToken> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let expires_at = now
            .checked_add(ttl.num_seconds())
            .context("Invalid timestamp")?;

        let claims = Claims {
            sub: identity.username.clone(),
            role: identity.role.as_str().to_string(),
            token_type: token_type.as_str().to_string(),
            iat: now,
            exp: expires_at,
            jti: Uuid::new_v4().simple().to_string(),
        };

        debug!(
            username = %identity.username,
            token_type = token_type.as_str(),
            expires_at,
            "Issuing token"
        );

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to generate JWT")?;

        Ok(IssuedToken {
            token,
            jti: claims.jti,
            expires_at,
        })
    }

    /// Validate a token of the expected type and extract the identity
    pub fn validate(&self, token: &str, expected: TokenType) -> Result<Identity, AuthError> {
        self.validate_at(token, expected, Utc::now().timestamp())
    }

    pub fn validate_at(
        &self,
        token: &str,
        expected: TokenType,
        now: i64,
    ) -> Result<Identity, AuthError> {
        let claims = self.verify_claims_at(token, expected, now)?;
        let role = UserRole::parse(&claims.role).ok_or(AuthError::MalformedClaims)?;

        Ok(Identity {
            username: claims.sub,
            role,
        })
    }

    /// Signature, type, expiry and claim-shape checks, in that order.
    /// Returns the full claim set for callers that need `jti`/`exp`.
    pub fn verify_claims_at(
        &self,
        token: &str,
        expected: TokenType,
        now: i64,
    ) -> Result<Claims, AuthError> {
        // 1. signature (also rejects anything that is not a well-formed HS256 JWT)
        let raw = decode::<serde_json::Value>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "Token signature check failed");
                AuthError::InvalidSignature
            })?
            .claims;

        // 2. token type
        let token_type = raw.get("token_type").and_then(|v| v.as_str());
        if token_type != Some(expected.as_str()) {
            return Err(AuthError::WrongTokenType);
        }

        // 3. expiry
        let exp = raw
            .get("exp")
            .and_then(|v| v.as_i64())
            .ok_or(AuthError::MalformedClaims)?;
        if exp <= now {
            return Err(AuthError::Expired);
        }

        // 4. remaining claims, role checked by the caller
        let claims: Claims =
            serde_json::from_value(raw).map_err(|_| AuthError::MalformedClaims)?;
        if UserRole::parse(&claims.role).is_none() {
            return Err(AuthError::MalformedClaims);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn admin() -> Identity {
        Identity {
            username: "admin".to_string(),
            role: UserRole::Admin,
        }
    }

    fn handler() -> JwtHandler {
        JwtHandler::new("test-secret-key-12345")
    }

    fn sign_raw(secret: &str, claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let handler = handler();
        let issued = handler.issue_access_token(&admin()).unwrap();
        assert!(!issued.token.is_empty());

        let identity = handler.validate(&issued.token, TokenType::Access).unwrap();
        assert_eq!(identity, admin());
    }

    #[test]
    fn test_refresh_outlives_access() {
        let handler = handler();
        let pair = handler.issue_pair(&admin()).unwrap();
        assert!(pair.refresh.expires_at > pair.access.expires_at);
        assert_ne!(pair.access.jti, pair.refresh.jti);
    }

    #[test]
    fn test_invalid_token_rejected() {
        let result = handler().validate("invalid.token.here", TokenType::Access);
        assert_eq!(result, Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_different_secrets_reject() {
        let handler1 = JwtHandler::new("secret1");
        let handler2 = JwtHandler::new("secret2");

        let issued = handler1.issue_access_token(&admin()).unwrap();
        let result = handler2.validate(&issued.token, TokenType::Access);
        assert_eq!(result, Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_refresh_token_not_accepted_as_access() {
        let handler = handler();
        let refresh = handler.issue_refresh_token(&admin()).unwrap();
        assert_eq!(
            handler.validate(&refresh.token, TokenType::Access),
            Err(AuthError::WrongTokenType)
        );

        let access = handler.issue_access_token(&admin()).unwrap();
        assert_eq!(
            handler.validate(&access.token, TokenType::Refresh),
            Err(AuthError::WrongTokenType)
        );
    }

    #[test]
    fn test_expired_access_token() {
        let handler = handler();
        let now = Utc::now().timestamp();
        let issued = handler
            .issue_at(&admin(), TokenType::Access, now - 3600)
            .unwrap();

        assert_eq!(
            handler.validate(&issued.token, TokenType::Access),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let handler = handler();
        let issued = handler.issue_at(&admin(), TokenType::Access, 1_000).unwrap();
        let exp = issued.expires_at;

        assert!(handler
            .validate_at(&issued.token, TokenType::Access, exp - 1)
            .is_ok());
        assert_eq!(
            handler.validate_at(&issued.token, TokenType::Access, exp),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn test_type_checked_before_expiry() {
        let handler = handler();
        let issued = handler.issue_at(&admin(), TokenType::Refresh, 0).unwrap();
        assert_eq!(
            handler.validate(&issued.token, TokenType::Access),
            Err(AuthError::WrongTokenType)
        );
    }

    #[test]
    fn test_unknown_role_is_malformed() {
        let exp = Utc::now().timestamp() + 600;
        let token = sign_raw(
            "test-secret-key-12345",
            json!({
                "sub": "mallory",
                "role": "superuser",
                "token_type": "access",
                "iat": 0,
                "exp": exp,
                "jti": "x",
            }),
        );

        assert_eq!(
            handler().validate(&token, TokenType::Access),
            Err(AuthError::MalformedClaims)
        );
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let exp = Utc::now().timestamp() + 600;
        let token = sign_raw(
            "test-secret-key-12345",
            json!({ "token_type": "access", "exp": exp }),
        );

        assert_eq!(
            handler().validate(&token, TokenType::Access),
            Err(AuthError::MalformedClaims)
        );
    }

    #[test]
    fn test_expired_forgery_still_fails_signature_first() {
        let token = sign_raw(
            "attacker-secret",
            json!({
                "sub": "admin",
                "role": "admin",
                "token_type": "access",
                "iat": 0,
                "exp": 1,
                "jti": "x",
            }),
        );

        assert_eq!(
            handler().validate(&token, TokenType::Access),
            Err(AuthError::InvalidSignature)
        );
    }
}
