//! General application configuration.

use serde::{Deserialize, Serialize};

fn default_currency() -> String {
    "USD".into()
}

const fn default_page_size() -> u32 {
    20
}

const fn default_max_page_size() -> u32 {
    100
}

/// 10.00 in the platform currency.
const fn default_min_withdrawal_cents() -> i64 {
    1_000
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// ISO 4217 code shown next to amounts.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Page size when a list request does not specify one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Smallest withdrawal a user may request.
    #[serde(default = "default_min_withdrawal_cents")]
    pub min_withdrawal_cents: i64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            min_withdrawal_cents: default_min_withdrawal_cents(),
        }
    }
}
