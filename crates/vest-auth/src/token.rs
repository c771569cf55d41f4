//! HS256 access tokens signed with the configured secret.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use vest_config::AuthConfig;
use vest_core::enums::Role;

use crate::claims::{VestClaims, WireClaims};
use crate::error::AuthError;

/// Ten years; longer lifetimes are clamped.
const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 3600;

/// A freshly issued token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies access tokens with one shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    ttl: TimeDelta,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &str, issuer: impl Into<String>, ttl_secs: u64) -> Self {
        let issuer = issuer.into();
        let secs = i64::try_from(ttl_secs.min(MAX_TTL_SECS)).unwrap_or(i64::MAX);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
            ttl: TimeDelta::seconds(secs),
        }
    }

    /// Build from `[auth]` configuration after validating it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` for a missing or short secret or a zero TTL.
    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self::new(&config.jwt_secret, config.issuer.clone(), config.token_ttl_secs))
    }

    /// Issue a token for `user_id` valid from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the claims cannot be encoded.
    pub fn issue(&self, user_id: &str, role: Role) -> Result<IssuedToken, AuthError> {
        self.issue_at(user_id, role, Utc::now())
    }

    /// Issue a token as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the claims cannot be encoded.
    pub fn issue_at(
        &self,
        user_id: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = now + self.ttl;
        let claims = WireClaims {
            sub: user_id.to_string(),
            role,
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::InvalidToken(format!("encode claims: {e}")))?;

        Ok(IssuedToken {
            token,
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or(expires_at),
        })
    }

    /// Verify signature, algorithm, issuer and expiry.
    ///
    /// # Errors
    ///
    /// `TokenExpired` once `exp` has passed, `InvalidToken` for anything else.
    pub fn verify(&self, token: &str) -> Result<VestClaims, AuthError> {
        let data = decode::<WireClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("rejected expired token");
                    AuthError::TokenExpired
                }
                ErrorKind::InvalidSignature => {
                    tracing::debug!("rejected token with bad signature");
                    AuthError::InvalidToken("signature mismatch".into())
                }
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;
        let claims = data.claims;

        let issued_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid iat".into()))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| AuthError::InvalidToken("invalid exp".into()))?;

        Ok(VestClaims {
            user_id: claims.sub,
            role: claims.role,
            issued_at,
            expires_at,
        })
    }
}
