//! # vest-auth
//!
//! Credentials for Vest.
//!
//! Argon2id password hashing with a length and character policy, HS256
//! access tokens signed with the configured secret, and single-use password
//! reset tokens of which only the SHA-256 digest is ever stored.

pub mod claims;
pub mod error;
pub mod password;
pub mod reset;
pub mod token;

pub use claims::VestClaims;
pub use error::AuthError;
pub use password::{hash_password, validate_password, verify_dummy, verify_password};
pub use reset::{ResetToken, generate_reset_token, hash_reset_token};
pub use token::{IssuedToken, TokenSigner};

/// Extract the token from an `Authorization: Bearer <token>` header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
