//! Salted one-way password hashing (argon2id, PHC string output).
//!
//! Hashing is deliberately slow, so both operations run on the blocking
//! pool instead of an async worker.

use anyhow::{Context as _, anyhow};
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

use crate::error::AuthServiceError;

/// Well-formed argon2id digest that no password matches. Login verifies
/// against it when the account does not exist so every miss costs one hash.
pub const UNKNOWN_USER_DIGEST: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$5WzN7ccONwJDyMs/TO+3bA$av0DXZhT1MWA9z/25T16znakEXx/AJ0z7InZG8YkbVo";

/// Hash `plaintext` with a fresh random salt.
pub async fn hash_password(plaintext: &str) -> Result<String, AuthServiceError> {
    let plaintext = plaintext.to_owned();
    let digest = tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .context("join password hashing task")?
    .map_err(|e| anyhow!("hash password: {e}"))?;
    Ok(digest)
}

/// Whether `plaintext` matches `digest`. A malformed digest never matches.
pub async fn verify_password(plaintext: &str, digest: &str) -> bool {
    let plaintext = plaintext.to_owned();
    let digest = digest.to_owned();
    tokio::task::spawn_blocking(move || {
        PasswordHash::new(&digest)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(plaintext.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    })
    .await
    .unwrap_or(false)
}
