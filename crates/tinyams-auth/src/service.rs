//! Authentication service: association login, the session gate and
//! logout.

use chrono::{DateTime, Duration, Utc};
use tinyams_core::error::{AmsError, AmsResult};
use tinyams_core::models::session::CreateSession;
use tinyams_core::repository::{AssociationRepository, SessionRepository};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for the login flow. Form fields arrive as-is; absent and blank
/// values are rejected the same way as a wrong password.
#[derive(Debug, Default)]
pub struct LoginInput {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Token of the session the client currently holds, if any. It is
    /// always cleared, whether or not the login succeeds.
    pub previous_token: Option<String>,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Raw opaque session token (return to client, not stored).
    pub token: String,
    pub session_id: Uuid,
    pub association_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<A: AssociationRepository, S: SessionRepository> {
    association_repo: A,
    session_repo: S,
    config: AuthConfig,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl<A: AssociationRepository, S: SessionRepository> AuthService<A, S> {
    pub fn new(association_repo: A, session_repo: S, config: AuthConfig) -> Self {
        Self {
            association_repo,
            session_repo,
            config,
        }
    }

    /// Resolve a username/password pair to an association id.
    ///
    /// An unknown username and a wrong password are the same
    /// `AuthenticationFailed`; only storage and hash faults escape as
    /// anything else.
    pub async fn authenticate_association(&self, username: &str, password: &str) -> AmsResult<Uuid> {
        let association = match self.association_repo.get_by_username(username).await {
            Ok(a) => a,
            Err(AmsError::NotFound { .. }) => return Err(AuthError::InvalidCredentials.into()),
            Err(e) => return Err(e),
        };

        password::verify_password(
            password,
            &association.password_hash,
            self.config.pepper.as_deref(),
        )?;

        Ok(association.id)
    }

    /// Log an association in and bind a fresh server-side session.
    pub async fn login(&self, input: LoginInput) -> AmsResult<LoginOutput> {
        // 1. Forget whatever session the client held.
        self.logout(input.previous_token.as_deref()).await?;

        // 2. Both fields are required, but say nothing about which one
        //    was missing.
        let (Some(username), Some(password)) = (
            non_blank(input.username.as_deref()),
            non_blank(input.password.as_deref()),
        ) else {
            warn!("Login rejected: missing username or password");
            return Err(AuthError::InvalidCredentials.into());
        };

        // 3. Verify credentials.
        let association_id = match self.authenticate_association(username, password).await {
            Ok(id) => id,
            Err(AmsError::AuthenticationFailed) => {
                warn!(%username, "Login rejected: invalid credentials");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        // 4. Generate token and create session.
        let raw = token::generate_session_token();
        let expires_at =
            Utc::now() + Duration::seconds(self.config.session_lifetime_secs as i64);

        let session = self
            .session_repo
            .create(CreateSession {
                association_id,
                token_hash: token::hash_session_token(&raw),
                expires_at,
            })
            .await?;

        info!(%association_id, session_id = %session.id, "Association logged in");

        Ok(LoginOutput {
            token: raw,
            session_id: session.id,
            association_id,
            expires_at: session.expires_at,
        })
    }

    /// The gate in front of every tenant-scoped operation.
    ///
    /// Missing, unknown and expired tokens are all `SessionRequired`.
    /// Expired sessions are removed on sight.
    pub async fn require_session(&self, token: Option<&str>) -> AmsResult<Uuid> {
        let Some(raw) = non_blank(token) else {
            return Err(AuthError::SessionRequired.into());
        };

        let session = match self
            .session_repo
            .get_by_token_hash(&token::hash_session_token(raw))
            .await
        {
            Ok(s) => s,
            Err(AmsError::NotFound { .. }) => return Err(AuthError::SessionRequired.into()),
            Err(e) => return Err(e),
        };

        if session.expires_at <= Utc::now() {
            debug!(session_id = %session.id, "Session expired");
            self.session_repo.invalidate(session.id).await?;
            return Err(AuthError::SessionRequired.into());
        }

        Ok(session.association_id)
    }

    /// Clear the session behind `token`. Succeeds when there is none.
    pub async fn logout(&self, token: Option<&str>) -> AmsResult<()> {
        let Some(raw) = non_blank(token) else {
            return Ok(());
        };

        match self
            .session_repo
            .get_by_token_hash(&token::hash_session_token(raw))
            .await
        {
            Ok(session) => {
                self.session_repo.invalidate(session.id).await?;
                info!(association_id = %session.association_id, "Association logged out");
                Ok(())
            }
            Err(AmsError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Housekeeping: drop every expired session.
    pub async fn purge_expired_sessions(&self) -> AmsResult<u64> {
        let removed = self.session_repo.cleanup_expired().await?;
        if removed > 0 {
            info!(removed, "Purged expired sessions");
        }
        Ok(removed)
    }
}
