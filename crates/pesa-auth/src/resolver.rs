use std::sync::Arc;

use chrono::Duration;
use pesa_core::{Identity, Role};
use uuid::Uuid;

use crate::error::AuthError;
use crate::store::ISessionStore;
use crate::token::{SessionToken, SCOPE_AUTHENTICATION};

/// Resolves an inbound `Authorization` value to a caller identity.
///
/// Runs once per request; the resolved [`Identity`] is then threaded as an
/// explicit argument through the engine flows, never re-resolved mid-flow.
pub struct SessionResolver {
    sessions: Arc<dyn ISessionStore>,
    ttl: Duration,
}

impl SessionResolver {
    pub fn new(sessions: Arc<dyn ISessionStore>, ttl: Duration) -> Self {
        Self { sessions, ttl }
    }

    /// Resolve a raw `Authorization` value.
    ///
    /// No value at all is the anonymous caller, not an error; a malformed
    /// header or an unknown/expired token is `Unauthenticated`.
    pub async fn resolve(&self, authorization: Option<&str>) -> Result<Identity, AuthError> {
        let Some(header) = authorization else {
            return Ok(Identity::Anonymous);
        };

        let parts: Vec<&str> = header.split(' ').collect();
        if parts.len() != 2 || parts[0] != "Bearer" {
            return Err(AuthError::Unauthenticated(
                "invalid authorization header".into(),
            ));
        }

        let hash = SessionToken::hash_plaintext(parts[1]);
        match self
            .sessions
            .identity_for_token(SCOPE_AUTHENTICATION, &hash)
            .await?
        {
            Some(identity) => Ok(identity),
            None => Err(AuthError::Unauthenticated(
                "token expired or not found".into(),
            )),
        }
    }

    /// Gate for endpoints that require a real caller.
    pub fn require_identified(identity: &Identity) -> Result<(), AuthError> {
        if identity.is_anonymous() {
            return Err(AuthError::Unauthorized);
        }
        Ok(())
    }

    /// Issue and persist a fresh token for an identity that has already
    /// proven its password (login lives with the HTTP layer).
    pub async fn issue(&self, identity_id: Uuid, role: Role) -> Result<SessionToken, AuthError> {
        let token = SessionToken::generate(identity_id, role, self.ttl, SCOPE_AUTHENTICATION);
        self.sessions.insert_token(&token).await?;
        tracing::info!(identity_id = %identity_id, role = %role, "session token issued");
        Ok(token)
    }

    /// Revoke every authentication token the identity holds.
    pub async fn revoke_all(&self, identity_id: Uuid) -> Result<(), AuthError> {
        self.sessions
            .revoke_all(identity_id, SCOPE_AUTHENTICATION)
            .await
    }
}
