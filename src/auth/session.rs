use std::sync::Arc;

use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{
    claims::{Claims, TokenKind},
    jwt::JwtKeys,
    repo::{SessionStore, StoreError},
    repo_types::User,
};
use crate::config::AuthConfig;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("provider `{0}` is not configured")]
    UnknownProvider(String),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An established session and the token pair that carries it.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

/// Identity resolved from a valid access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

/// Issues, checks and revokes sessions. Tokens are JWTs bound to a row in the session store.
#[derive(Clone)]
pub struct SessionManager {
    config: AuthConfig,
    keys: JwtKeys,
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(config: AuthConfig, keys: JwtKeys, store: Arc<dyn SessionStore>) -> Self {
        Self {
            config,
            keys,
            store,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Open a session for a principal the named provider has already vouched for.
    pub async fn sign_in(&self, provider: &str, user: &User) -> Result<Session, SessionError> {
        if !self.config.has_provider(provider) {
            warn!(provider, "sign-in with unconfigured provider");
            return Err(SessionError::UnknownProvider(provider.to_string()));
        }

        let expires_at = OffsetDateTime::now_utc()
            + TimeDuration::seconds(self.keys.refresh_ttl.as_secs() as i64);
        let session_id = self.store.create(user.id, expires_at).await?;
        let session = self.issue(user.id, session_id)?;

        info!(user_id = %user.id, session_id = %session_id, provider, "session opened");
        Ok(session)
    }

    pub async fn authenticate(&self, access_token: &str) -> Result<AuthSession, SessionError> {
        let claims = self.active_claims(access_token, TokenKind::Access).await?;
        Ok(AuthSession {
            user_id: claims.sub,
            session_id: claims.sid,
        })
    }

    /// New token pair for a still-active session.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Session, SessionError> {
        let claims = self.active_claims(refresh_token, TokenKind::Refresh).await?;
        self.issue(claims.sub, claims.sid)
    }

    pub async fn sign_out(&self, session_id: Uuid) -> Result<(), SessionError> {
        self.store.revoke(session_id).await?;
        info!(session_id = %session_id, "session closed");
        Ok(())
    }

    fn issue(&self, user_id: Uuid, session_id: Uuid) -> Result<Session, SessionError> {
        Ok(Session {
            session_id,
            user_id,
            access_token: self.keys.sign_access(user_id, session_id)?,
            refresh_token: self.keys.sign_refresh(user_id, session_id)?,
        })
    }

    async fn active_claims(&self, token: &str, kind: TokenKind) -> Result<Claims, SessionError> {
        let claims = self.keys.verify(token).map_err(|e| {
            debug!(error = %e, "token rejected");
            SessionError::InvalidCredentials
        })?;
        if !claims.is(kind) {
            return Err(SessionError::InvalidCredentials);
        }
        if !self.store.is_active(claims.sid).await? {
            debug!(session_id = %claims.sid, "session no longer active");
            return Err(SessionError::InvalidCredentials);
        }
        Ok(claims)
    }
}
