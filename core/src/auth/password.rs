//! Argon2id password hashing.
//!
//! Both operations run on the blocking pool.

use anyhow::{Context, Result, anyhow};
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tokio::task;

/// Minimum accepted password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

pub async fn hash_password(password: String) -> Result<String> {
    task::spawn_blocking(move || {
        let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
            .map_err(|err| anyhow!("Failed to encode password salt: {err}"))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| anyhow!("Failed to hash password: {err}"))
    })
    .await
    .context("Password hashing task failed")?
}

/// `Ok(false)` on mismatch. A stored hash that does not parse is a mismatch.
pub async fn verify_password(password: String, stored_hash: String) -> Result<bool> {
    task::spawn_blocking(move || {
        let parsed = match PasswordHash::new(&stored_hash) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("Stored password hash is unreadable: {err}");
                return false;
            }
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
    .await
    .context("Password verification task failed")
}
