//! Short code and claim token generation.

use crate::error::AppError;
use base64::Engine as _;
use rand::Rng;
use serde_json::json;
use sha2::{Digest, Sha256};

const BASE62: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Length of generated short codes.
pub const CODE_LENGTH: usize = 7;

/// Random bytes in a guest claim token before encoding.
const CLAIM_TOKEN_BYTES: usize = 32;

const MIN_CUSTOM_LEN: usize = 4;
const MAX_CUSTOM_LEN: usize = 32;

/// Codes that would shadow service routes.
const RESERVED_CODES: &[&str] = &["r", "api", "health", "admin", "stats", "static", "login"];

/// Generates a random base62 short code of [`CODE_LENGTH`] characters.
///
/// Each character is a uniform draw from the 62-symbol alphabet.
pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| BASE62[rng.random_range(0..BASE62.len())] as char)
        .collect()
}

/// Validates a user-provided custom short code.
///
/// # Rules
///
/// - Length: 4-32 characters
/// - Allowed characters: ASCII letters, digits, `-` and `_`
/// - Cannot start or end with `-` or `_`
/// - Cannot be a reserved route name (case-insensitive)
///
/// # Errors
///
/// Returns [`AppError::Validation`] when a rule is violated.
pub fn validate_custom_code(code: &str) -> Result<(), AppError> {
    if code.len() < MIN_CUSTOM_LEN || code.len() > MAX_CUSTOM_LEN {
        return Err(AppError::bad_request(
            format!("Custom code must be {MIN_CUSTOM_LEN}-{MAX_CUSTOM_LEN} characters"),
            json!({ "provided_length": code.len() }),
        ));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::bad_request(
            "Custom code can only contain letters, digits, hyphens and underscores",
            json!({ "code": code }),
        ));
    }

    let edge = |c: char| c == '-' || c == '_';
    if code.starts_with(edge) || code.ends_with(edge) {
        return Err(AppError::bad_request(
            "Custom code cannot start or end with a hyphen or underscore",
            json!({ "code": code }),
        ));
    }

    if RESERVED_CODES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(code))
    {
        return Err(AppError::bad_request(
            "This code is reserved",
            json!({ "code": code }),
        ));
    }

    Ok(())
}

/// Generates a one-time guest claim token (URL-safe base64, 43 characters).
///
/// # Panics
///
/// Panics if the system random number generator fails.
pub fn generate_claim_token() -> String {
    let mut buffer = [0u8; CLAIM_TOKEN_BYTES];
    getrandom::fill(&mut buffer).expect("Failed to generate random bytes");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buffer)
}

/// SHA-256 of a claim token, hex encoded. Only this value is stored.
pub fn hash_claim_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
