//! Argon2id password hashing.
//!
//! Hashes are PHC strings (`$argon2id$v=19$...`) carrying their own salt and
//! parameters, so verification needs only the stored string.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use std::sync::OnceLock;

use crate::error::AuthError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

const SALT_BYTES: usize = 16;

/// Check a candidate password: 8 to 128 characters with at least one letter
/// and one digit.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` describing the first failed rule.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(format!(
            "must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if len > MAX_PASSWORD_LEN {
        return Err(AuthError::WeakPassword(format!(
            "must be at most {MAX_PASSWORD_LEN} characters"
        )));
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(AuthError::WeakPassword("must contain a letter".into()));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AuthError::WeakPassword("must contain a digit".into()));
    }
    Ok(())
}

/// Validate and hash a password with a fresh random salt.
///
/// # Errors
///
/// `WeakPassword` when the policy fails, `Random` or `Hashing` on internal failure.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    validate_password(password)?;

    let mut salt_bytes = [0u8; SALT_BYTES];
    getrandom::fill(&mut salt_bytes).map_err(|e| AuthError::Random(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check `password` against a stored PHC hash.
///
/// # Errors
///
/// Returns `AuthError::Hashing` when the stored hash cannot be parsed. A wrong
/// password is `Ok(false)`.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthError::Hashing(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Hashing(e.to_string())),
    }
}

static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

/// Run a verification against a throwaway hash.
///
/// Login calls this when no account matches, so an unknown email costs the
/// same Argon2 work as a wrong password.
pub fn verify_dummy(password: &str) {
    let dummy = DUMMY_HASH.get_or_init(|| hash_password("no-such-account-0").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
}
