//! Access token and password reset configuration.

use serde::{Deserialize, Serialize};

/// Shortest accepted signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// 24 hours.
const fn default_token_ttl_secs() -> u64 {
    86_400
}

fn default_issuer() -> String {
    "vest".into()
}

/// 1 hour.
const fn default_reset_ttl_secs() -> u64 {
    3_600
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HMAC secret for access tokens.
    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Lifetime of password reset links.
    #[serde(default = "default_reset_ttl_secs")]
    pub reset_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_secs: default_token_ttl_secs(),
            issuer: default_issuer(),
            reset_ttl_secs: default_reset_ttl_secs(),
        }
    }
}

impl AuthConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.jwt_secret.is_empty()
    }

    /// Check that the signing secret is usable for serving requests.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotConfigured` when the secret is empty and
    /// `ConfigError::InvalidValue` when it is shorter than [`MIN_JWT_SECRET_LEN`].
    pub fn validate(&self) -> Result<(), crate::ConfigError> {
        if !self.is_configured() {
            return Err(crate::ConfigError::NotConfigured {
                section: "auth".into(),
            });
        }
        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(crate::ConfigError::InvalidValue {
                field: "auth.jwt_secret".into(),
                reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            });
        }
        if self.token_ttl_secs == 0 {
            return Err(crate::ConfigError::InvalidValue {
                field: "auth.token_ttl_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}
