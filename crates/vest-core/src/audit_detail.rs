//! Typed audit detail payloads.
//!
//! Each audit action can carry a structured `detail` JSON blob. These types
//! fix the shape of the most common ones.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Detail for `AuditAction::StatusChanged`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct StatusChangedDetail {
    pub from: String,
    pub to: String,
    pub reason: Option<String>,
}

/// Detail for `AuditAction::RoleChanged`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct RoleChangedDetail {
    pub from: String,
    pub to: String,
}

/// Detail for `AuditAction::Distributed`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DistributedDetail {
    pub distribution_id: String,
    pub period: String,
    pub rate_bps: i64,
    pub investment_count: u32,
    pub total_amount_cents: i64,
}

/// Detail for a payment approval, linking the investment it produced.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PaymentApprovedDetail {
    pub investment_id: String,
    pub amount_cents: i64,
}
