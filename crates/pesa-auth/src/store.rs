use async_trait::async_trait;
use pesa_core::Identity;
use pesa_crypto::Digest;
use uuid::Uuid;

use crate::error::AuthError;
use crate::token::SessionToken;

/// Session persistence contract.
///
/// Implementations sit on the relational store; the in-memory adapter in
/// `pesa-settlement` implements it for local use and tests.
#[async_trait]
pub trait ISessionStore: Send + Sync {
    /// Persist a newly issued token. Only the digest, binding, scope, and
    /// expiry are stored, never the plaintext.
    async fn insert_token(&self, token: &SessionToken) -> Result<(), AuthError>;

    /// Resolve a token digest to its bound identity within a scope.
    ///
    /// Expired tokens must not match; they need not be deleted.
    async fn identity_for_token(
        &self,
        scope: &str,
        hash: &Digest,
    ) -> Result<Option<Identity>, AuthError>;

    /// Remove every token the identity holds in the scope (logout
    /// everywhere).
    async fn revoke_all(&self, identity_id: Uuid, scope: &str) -> Result<(), AuthError>;
}
