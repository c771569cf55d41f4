use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token expired")]
    TokenExpired,

    #[error("random number generator failed: {0}")]
    Random(String),

    #[error(transparent)]
    Config(#[from] vest_config::ConfigError),
}
