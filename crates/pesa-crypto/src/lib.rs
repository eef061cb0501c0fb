//! Pesa cryptographic operations.
//!
//! Argon2id password credentials, BLAKE3 digests for session tokens, and
//! Ed25519 signing keys for ledger transfers.

pub mod error;
pub mod hashing;
pub mod keys;
pub mod password;

pub use error::CryptoError;
pub use hashing::{digest, Digest};
pub use keys::KeyPair;
pub use password::{hash_password, verify_password};
