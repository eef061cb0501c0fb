use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use pesa_core::Role;
use pesa_crypto::{digest, Digest};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;
use uuid::Uuid;

/// The only token scope the engine consumes.
pub const SCOPE_AUTHENTICATION: &str = "authentication";

/// An opaque bearer token.
///
/// The plaintext exists only in the issuance response; the store ever sees
/// the digest. Multiple live tokens per identity are allowed (one per
/// device).
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    #[serde(rename = "token")]
    pub plaintext: String,
    #[serde(skip)]
    pub hash: Digest,
    #[serde(skip)]
    pub identity_id: Uuid,
    #[serde(skip)]
    pub role: Role,
    pub expiry: DateTime<Utc>,
    #[serde(skip)]
    pub scope: String,
}

impl SessionToken {
    /// Generate a fresh token: 32 bytes of OS entropy, base64url plaintext,
    /// BLAKE3 digest.
    pub fn generate(identity_id: Uuid, role: Role, ttl: Duration, scope: &str) -> Self {
        let mut entropy = [0u8; 32];
        OsRng.fill_bytes(&mut entropy);
        let plaintext = URL_SAFE_NO_PAD.encode(entropy);
        let hash = digest(plaintext.as_bytes());

        Self {
            plaintext,
            hash,
            identity_id,
            role,
            expiry: Utc::now() + ttl,
            scope: scope.to_string(),
        }
    }

    /// Digest an inbound plaintext for lookup.
    pub fn hash_plaintext(plaintext: &str) -> Digest {
        digest(plaintext.as_bytes())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }
}
