use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{IndexStatus, RiskLevel};

/// A curated investment product.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Index {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub risk_level: RiskLevel,
    pub min_investment_cents: i64,
    /// Advertised weekly rate, in basis points.
    pub target_weekly_rate_bps: i64,
    /// Rate of the most recent distribution.
    pub last_rate_bps: Option<i64>,
    pub last_distributed_at: Option<DateTime<Utc>>,
    pub status: IndexStatus,
    /// Sum of active principal (computed, not stored).
    pub total_invested_cents: i64,
    /// Distinct users holding an active investment (computed, not stored).
    pub investor_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
