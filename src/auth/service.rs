//! Token session protocol
//! Mission: login, refresh rotation and logout on top of the credential store

use crate::auth::{
    error::AuthError,
    jwt::{JwtHandler, TokenPair},
    models::{Identity, TokenType, UserRole},
    revocation::RevocationList,
    user_store::{CredentialError, CredentialStore},
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Attempts against the credential store before giving up with 503
const STORE_ATTEMPTS: usize = 2;

#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    jwt: Arc<JwtHandler>,
    revoked: Option<Arc<RevocationList>>,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        jwt: Arc<JwtHandler>,
        revoked: Option<Arc<RevocationList>>,
    ) -> Self {
        Self {
            credentials,
            jwt,
            revoked,
        }
    }

    pub fn jwt(&self) -> &Arc<JwtHandler> {
        &self.jwt
    }

    /// Verify credentials and mint a token pair.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let role = self.verify_with_retry(username, password).await?;

        let identity = Identity {
            username: username.to_string(),
            role,
        };
        let pair = self.jwt.issue_pair(&identity).map_err(|e| {
            error!(error = %e, "Failed to issue tokens");
            AuthError::InternalError
        })?;

        info!(username, role = role.as_str(), "Login successful");
        Ok(pair)
    }

    async fn verify_with_retry(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserRole, AuthError> {
        for attempt in 1..=STORE_ATTEMPTS {
            let store = self.credentials.clone();
            let user = username.to_string();
            let pass = password.to_string();

            let outcome = tokio::task::spawn_blocking(move || store.verify(&user, &pass))
                .await
                .map_err(|e| CredentialError::Unavailable(e.into()));

            match outcome.and_then(|r| r) {
                Ok(role) => return Ok(role),
                Err(CredentialError::InvalidCredentials) => {
                    warn!(username, "Failed login attempt");
                    return Err(AuthError::InvalidCredentials);
                }
                Err(CredentialError::Unavailable(e)) => {
                    warn!(attempt, error = %e, "Credential store unavailable");
                }
            }
        }

        error!(username, "Credential store unavailable after retry");
        Err(AuthError::UpstreamStoreUnavailable)
    }

    /// Exchange a refresh token for a fresh pair. The presented token is
    /// denylisted first so concurrent replays cannot both succeed.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let now = Utc::now().timestamp();
        let claims = self
            .jwt
            .verify_claims_at(refresh_token, TokenType::Refresh, now)?;

        if let Some(revoked) = &self.revoked {
            if !revoked.revoke(&claims.jti, claims.exp, now) {
                warn!(username = %claims.sub, jti = %claims.jti, "Refresh token replayed");
                return Err(AuthError::Revoked);
            }
        }

        let role = UserRole::parse(&claims.role).ok_or(AuthError::MalformedClaims)?;
        let identity = Identity {
            username: claims.sub,
            role,
        };
        let pair = self.jwt.issue_pair(&identity).map_err(|e| {
            error!(error = %e, "Failed to issue tokens");
            AuthError::InternalError
        })?;

        info!(username = %identity.username, "Tokens refreshed");
        Ok(pair)
    }

    /// Logout never fails. A refresh token, when supplied and valid, is
    /// denylisted for its remaining lifetime.
    pub fn logout(&self, refresh_token: Option<&str>) {
        let now = Utc::now().timestamp();
        let claims = refresh_token.and_then(|token| {
            self.jwt
                .verify_claims_at(token, TokenType::Refresh, now)
                .ok()
        });

        match (claims, &self.revoked) {
            (Some(claims), Some(revoked)) => {
                revoked.revoke(&claims.jti, claims.exp, now);
                info!(username = %claims.sub, "Logout, refresh token revoked");
            }
            (Some(claims), None) => info!(username = %claims.sub, "Logout"),
            (None, _) => info!("Logout"),
        }
    }
}
