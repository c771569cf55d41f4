use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::period::Period;

/// One weekly crediting of returns across an index. Unique per
/// `(index_id, period)`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Distribution {
    pub id: String,
    pub index_id: String,
    pub period: Period,
    pub rate_bps: i64,
    pub investment_count: u32,
    pub total_amount_cents: i64,
    pub distributed_by: String,
    pub created_at: DateTime<Utc>,
}

/// A single investment's share of a distribution.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReturnEntry {
    pub id: String,
    pub investment_id: String,
    pub distribution_id: String,
    pub period: Period,
    pub rate_bps: i64,
    pub amount_cents: i64,
    pub created_at: DateTime<Utc>,
}
