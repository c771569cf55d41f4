//! Index update builder.

use serde::Serialize;
use vest_core::enums::RiskLevel;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_investment_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_weekly_rate_bps: Option<i64>,
}

impl IndexUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.risk_level.is_none()
            && self.min_investment_cents.is_none()
            && self.target_weekly_rate_bps.is_none()
    }
}

pub struct IndexUpdateBuilder(IndexUpdate);

impl IndexUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(IndexUpdate::default())
    }

    /// Renaming does not change the slug.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.0.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: Option<String>) -> Self {
        self.0.description = Some(description);
        self
    }

    #[must_use]
    pub fn risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.0.risk_level = Some(risk_level);
        self
    }

    #[must_use]
    pub fn min_investment_cents(mut self, cents: i64) -> Self {
        self.0.min_investment_cents = Some(cents);
        self
    }

    #[must_use]
    pub fn target_weekly_rate_bps(mut self, bps: i64) -> Self {
        self.0.target_weekly_rate_bps = Some(bps);
        self
    }

    #[must_use]
    pub fn build(self) -> IndexUpdate {
        self.0
    }
}

impl Default for IndexUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
