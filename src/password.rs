//! Password hashing and verification using Argon2id.
//!
//! Plaintext passwords are hashed with a random salt before they reach the
//! store and are never persisted or returned. Hashes use the PHC string
//! format (`$argon2id$v=19$...`).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use crate::error::ApiError;

/// Hash a plaintext password. Returns a PHC-format string.
pub fn hash(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  let hash = Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))?;
  Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-format hash.
pub fn verify(password: &str, stored: &str) -> Result<bool, ApiError> {
  let parsed =
    PasswordHash::new(stored).map_err(|e| ApiError::Internal(format!("Invalid password hash: {e}")))?;
  Ok(
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok(),
  )
}
