use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{PaymentMethod, WithdrawalStatus};

/// A request to pay credited returns out to the user.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Withdrawal {
    pub id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// Free-form payout destination (account number, wallet address).
    pub destination: String,
    pub status: WithdrawalStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}
