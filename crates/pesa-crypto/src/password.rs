use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::CryptoError;

/// Hash a password with Argon2id, returning the PHC string to store.
///
/// Plaintext passwords are never persisted; only this string is.
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CryptoError::PasswordHashError(format!("argon2 hash failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string.
///
/// A mismatched password is `Ok(false)`; only a malformed hash or an
/// internal failure is an error.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, CryptoError> {
    let argon2 = Argon2::default();
    let parsed = argon2::PasswordHash::new(phc)
        .map_err(|e| CryptoError::PasswordHashError(format!("invalid hash format: {}", e)))?;

    match argon2.verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CryptoError::PasswordHashError(format!(
            "verification error: {}",
            e
        ))),
    }
}
