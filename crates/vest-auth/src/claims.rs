use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vest_core::enums::Role;
use vest_core::identity::AuthIdentity;

/// Verified access-token claims.
///
/// Produced by [`crate::TokenSigner::verify`], consumed by the HTTP extractors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VestClaims {
    /// User ID (`sub` claim).
    pub user_id: String,
    /// Role when the token was issued (`role` claim).
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl VestClaims {
    /// Convert to a lightweight `AuthIdentity` for cross-crate passing.
    #[must_use]
    pub fn to_identity(&self) -> AuthIdentity {
        AuthIdentity {
            user_id: self.user_id.clone(),
            role: self.role,
        }
    }
}

/// Claims as they appear in the token payload.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireClaims {
    pub sub: String,
    pub role: Role,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_identity_maps_fields() {
        let claims = VestClaims {
            user_id: "usr-a3f8b2c1".into(),
            role: Role::Admin,
            issued_at: Utc::now(),
            expires_at: Utc::now() + chrono::TimeDelta::hours(1),
        };
        let identity = claims.to_identity();
        assert_eq!(identity.user_id, "usr-a3f8b2c1");
        assert!(identity.is_admin());
    }

    #[test]
    fn wire_claims_use_registered_names() {
        let wire = WireClaims {
            sub: "usr-1".into(),
            role: Role::User,
            iss: "vest".into(),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"sub": "usr-1", "role": "user", "iss": "vest", "iat": 1, "exp": 2})
        );
    }
}
