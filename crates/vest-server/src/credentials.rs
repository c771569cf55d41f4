//! Argon2 hashing for handlers, run on the blocking pool.

use vest_auth::AuthError;

use crate::error::ApiError;

async fn off_runtime<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("password worker: {e}")))?
        .map_err(ApiError::from)
}

/// Validate and hash a new password.
pub async fn hash_password(password: String) -> Result<String, ApiError> {
    off_runtime(move || vest_auth::hash_password(&password)).await
}

/// Check a password against its stored hash; a mismatch is `Ok(false)`.
pub async fn verify_password(password: String, stored_hash: String) -> Result<bool, ApiError> {
    off_runtime(move || vest_auth::verify_password(&password, &stored_hash)).await
}

/// Spend one verification's worth of work for a login with no matching account.
pub async fn verify_unknown_account(password: String) -> Result<(), ApiError> {
    off_runtime(move || {
        vest_auth::verify_dummy(&password);
        Ok(())
    })
    .await
}
