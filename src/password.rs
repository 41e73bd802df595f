//! One-way password hashing and verification.
//!
//! Digests are Argon2id PHC strings with a per-call random salt, so hashing
//! the same plaintext twice never yields the same digest. Verification reads
//! the parameters embedded in the digest and compares in constant time.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

use crate::config::SecurityConfig;

/// Upper bound on plaintext length. Argon2 itself accepts far more, but
/// anything beyond this is not a credential a person typed.
const MAX_PASSWORD_LEN: usize = 512;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password must not be empty")]
    Empty,

    #[error("password exceeds {MAX_PASSWORD_LEN} characters")]
    TooLong,

    #[error("invalid Argon2 params: {0}")]
    InvalidParams(String),

    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Hash a plaintext password using Argon2id with the configured cost params.
pub fn hash(plaintext: &str, config: &SecurityConfig) -> Result<String, PasswordError> {
    if plaintext.is_empty() {
        return Err(PasswordError::Empty);
    }
    if plaintext.len() > MAX_PASSWORD_LEN {
        return Err(PasswordError::TooLong);
    }

    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| PasswordError::InvalidParams(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let digest = argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;

    Ok(digest.to_string())
}

/// Check a plaintext against a stored digest.
///
/// Returns `false` for any non-match, including digests that fail to parse.
/// Cost params are taken from the digest itself, so digests created under
/// older configs keep verifying.
#[must_use]
pub fn verify(plaintext: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        return false;
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}
