use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::Role;

/// Lightweight authenticated identity for cross-crate passing.
///
/// Produced by `vest-auth` from a verified access token, consumed by the
/// HTTP layer and passed to `vest-db` as the acting user for audit entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AuthIdentity {
    /// User ID (token `sub` claim).
    pub user_id: String,
    /// Role at the time the token was issued.
    pub role: Role,
}

impl AuthIdentity {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
