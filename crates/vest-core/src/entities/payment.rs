use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{PaymentMethod, ReviewStatus};

/// A user's declaration of an offline payment towards an index.
///
/// Approval materialises an [`Investment`](super::Investment) whose id is
/// recorded in `investment_id`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PaymentRequest {
    pub id: String,
    pub user_id: String,
    pub index_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub proof_path: Option<String>,
    pub status: ReviewStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<String>,
    pub investment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}
