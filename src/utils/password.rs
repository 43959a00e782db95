//! Link password hashing with Argon2id.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Errors from hashing or parsing a stored hash.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Password hash error: {0}")]
    Hash(String),

    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// Hashes a link password into a PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Checks a supplied password against a stored PHC hash.
///
/// Argon2 compares digests in constant time.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Resolves the password field of a link update.
///
/// - `None` keeps the stored hash
/// - `Some("")` removes protection
/// - anything else is hashed
pub fn password_update(new_password: Option<&str>) -> Result<Option<Option<String>>, PasswordError> {
    match new_password {
        None => Ok(None),
        Some("") => Ok(Some(None)),
        Some(pwd) => hash_password(pwd).map(|h| Some(Some(h))),
    }
}
