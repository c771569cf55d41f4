//! Password reset tokens.
//!
//! The user receives 32 random bytes as hex; the database keeps only the
//! SHA-256 digest, so a leaked table cannot be replayed.

use sha2::{Digest, Sha256};

use crate::error::AuthError;

pub const RESET_TOKEN_BYTES: usize = 32;

/// A new reset token: `token` goes in the email link, `token_hash` is stored.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub token_hash: String,
}

/// # Errors
///
/// Returns `AuthError::Random` if the OS RNG fails.
pub fn generate_reset_token() -> Result<ResetToken, AuthError> {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    getrandom::fill(&mut bytes).map_err(|e| AuthError::Random(e.to_string()))?;
    let token = hex::encode(bytes);
    let token_hash = hash_reset_token(&token);
    Ok(ResetToken { token, token_hash })
}

/// Digest a user-supplied token for lookup.
#[must_use]
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_hex_and_hash_matches() {
        let reset = generate_reset_token().unwrap();
        assert_eq!(reset.token.len(), RESET_TOKEN_BYTES * 2);
        assert!(reset.token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash_reset_token(&reset.token), reset.token_hash);
        assert_ne!(reset.token, reset.token_hash);
    }

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_reset_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn tokens_are_unique() {
        let a = generate_reset_token().unwrap();
        let b = generate_reset_token().unwrap();
        assert_ne!(a.token, b.token);
    }
}
