use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::InvestmentStatus;

/// Principal held in an index plus the returns credited to it so far.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Investment {
    pub id: String,
    pub user_id: String,
    pub index_id: String,
    pub payment_id: Option<String>,
    pub amount_cents: i64,
    pub total_returns_cents: i64,
    pub status: InvestmentStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}
