//! Outbound email configuration.

use serde::{Deserialize, Serialize};

fn default_from_address() -> String {
    "no-reply@vest.local".into()
}

fn default_app_url() -> String {
    "http://localhost:3000".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MailConfig {
    /// Send mail at all. When false, messages are dropped.
    #[serde(default)]
    pub enabled: bool,

    /// Transactional email API endpoint. Empty with `enabled = true` logs messages instead.
    #[serde(default)]
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Public frontend URL used to build links in emails.
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: String::new(),
            api_key: String::new(),
            from_address: default_from_address(),
            app_url: default_app_url(),
        }
    }
}

impl MailConfig {
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty() && !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_disabled() {
        let config = MailConfig::default();
        assert!(!config.enabled);
        assert!(!config.is_configured());
        assert_eq!(config.from_address, "no-reply@vest.local");
        assert_eq!(config.app_url, "http://localhost:3000");
    }
}
