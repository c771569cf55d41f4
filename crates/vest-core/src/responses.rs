//! Response shapes returned as JSON by the HTTP API and the `vest` CLI.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::{Distribution, Investment, ReturnEntry, User};

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            u32::try_from(total.div_ceil(u64::from(per_page))).unwrap_or(u32::MAX)
        };
        Self {
            items,
            page,
            per_page,
            total,
            total_pages,
        }
    }

    /// Transform the items, keeping the paging metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

/// Money position of a single user.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Balance {
    /// Active principal.
    pub total_invested_cents: i64,
    /// Returns credited across all investments, active or closed.
    pub total_returns_cents: i64,
    /// Returns held by pending, approved, or paid withdrawals.
    pub reserved_cents: i64,
    /// `max(0, total_returns - reserved)`.
    pub withdrawable_cents: i64,
}

impl Balance {
    #[must_use]
    pub fn new(total_invested_cents: i64, total_returns_cents: i64, reserved_cents: i64) -> Self {
        Self {
            total_invested_cents,
            total_returns_cents,
            reserved_cents,
            withdrawable_cents: (total_returns_cents - reserved_cents).max(0),
        }
    }
}

/// Response from `GET /api/dashboard`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PortfolioSummary {
    pub balance: Balance,
    pub active_investments: u32,
    pub pending_payments: u32,
    pub pending_withdrawals: u32,
    pub recent_returns: Vec<ReturnEntry>,
}

/// An investment with its index name and full return history.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct InvestmentDetail {
    pub investment: Investment,
    pub index_name: String,
    pub returns: Vec<ReturnEntry>,
}

/// One investment credited by a distribution.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReturnCredit {
    pub investment_id: String,
    pub user_id: String,
    pub amount_cents: i64,
    pub total_returns_cents: i64,
}

/// Response from a distribution run.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct DistributionReport {
    pub distribution: Distribution,
    pub index_name: String,
    pub credits: Vec<ReturnCredit>,
}

/// Response from `GET /api/admin/stats` and `vest stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PlatformStats {
    pub total_users: u64,
    pub kyc_pending: u64,
    pub active_indices: u64,
    pub assets_under_management_cents: i64,
    pub total_returns_distributed_cents: i64,
    pub pending_payments: u64,
    pub pending_withdrawals: u64,
}

/// Response from register and login.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct AuthResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}
