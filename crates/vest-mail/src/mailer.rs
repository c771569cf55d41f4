//! Email delivery.

use std::time::Duration;

use serde::Serialize;
use vest_config::{GeneralConfig, MailConfig};

use crate::error::MailError;
use crate::templates::{Email, Message};

const HTTP_TIMEOUT_SECS: u64 = 10;

/// How rendered emails leave the process.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// Drop messages.
    Disabled,
    /// Write messages to the log instead of sending them.
    Log,
    /// POST messages to a transactional email API.
    Http(HttpDelivery),
}

#[derive(Debug, Clone)]
pub struct HttpDelivery {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

#[derive(Serialize)]
struct OutgoingEmail<'a> {
    from: &'a str,
    to: &'a str,
    #[serde(flatten)]
    email: &'a Email,
}

/// Renders [`Message`]s and hands them to the configured [`Delivery`].
#[derive(Debug, Clone)]
pub struct Mailer {
    delivery: Delivery,
    from: String,
    currency: String,
    app_url: String,
}

impl Mailer {
    #[must_use]
    pub fn new(delivery: Delivery, from: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            delivery,
            from: from.into(),
            currency: currency.into(),
            app_url: String::new(),
        }
    }

    /// A mailer that drops everything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Delivery::Disabled, "no-reply@vest.local", "USD")
    }

    /// Choose delivery from configuration.
    ///
    /// `enabled = false` drops messages; `enabled` without an API URL and key
    /// logs them.
    ///
    /// # Errors
    ///
    /// Returns `MailError::Http` if the HTTP client cannot be built.
    pub fn from_config(mail: &MailConfig, general: &GeneralConfig) -> Result<Self, MailError> {
        let delivery = if !mail.enabled {
            Delivery::Disabled
        } else if mail.is_configured() {
            let client = reqwest::Client::builder()
                .user_agent(concat!("vest/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()?;
            Delivery::Http(HttpDelivery {
                client,
                api_url: mail.api_url.clone(),
                api_key: mail.api_key.clone(),
            })
        } else {
            tracing::warn!("mail enabled without api_url/api_key; emails will only be logged");
            Delivery::Log
        };

        Ok(Self {
            delivery,
            from: mail.from_address.clone(),
            currency: general.currency.clone(),
            app_url: mail.app_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub const fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    /// Frontend base URL without a trailing slash.
    #[must_use]
    pub fn app_url(&self) -> &str {
        &self.app_url
    }

    /// Render `message` in the configured currency.
    #[must_use]
    pub fn render(&self, message: &Message<'_>) -> Email {
        message.render(&self.currency)
    }

    /// Render and deliver one message.
    ///
    /// # Errors
    ///
    /// `InvalidRecipient` for an address without `@`, `Http` or `Api` when
    /// the mail API fails.
    pub async fn send(&self, to: &str, message: &Message<'_>) -> Result<(), MailError> {
        if !to.contains('@') {
            return Err(MailError::InvalidRecipient(to.to_string()));
        }
        let email = self.render(message);

        match &self.delivery {
            Delivery::Disabled => {
                tracing::debug!(to, kind = message.kind(), "mail disabled, dropping message");
            }
            Delivery::Log => {
                tracing::info!(
                    to,
                    kind = message.kind(),
                    subject = %email.subject,
                    body = %email.text,
                    "mail (log delivery)"
                );
            }
            Delivery::Http(http) => {
                let resp = http
                    .client
                    .post(&http.api_url)
                    .bearer_auth(&http.api_key)
                    .json(&OutgoingEmail {
                        from: &self.from,
                        to,
                        email: &email,
                    })
                    .send()
                    .await?;
                if !resp.status().is_success() {
                    return Err(MailError::Api {
                        status: resp.status().as_u16(),
                        message: resp.text().await.unwrap_or_default(),
                    });
                }
                tracing::debug!(to, kind = message.kind(), "mail sent");
            }
        }
        Ok(())
    }

    /// Deliver without failing the caller; errors are logged.
    pub async fn send_logged(&self, to: &str, message: &Message<'_>) {
        if let Err(e) = self.send(to, message).await {
            tracing::warn!(to, kind = message.kind(), error = %e, "mail delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_by_default() {
        let mailer = Mailer::from_config(&MailConfig::default(), &GeneralConfig::default()).unwrap();
        assert!(matches!(mailer.delivery(), Delivery::Disabled));
    }

    #[test]
    fn enabled_without_api_logs() {
        let mail = MailConfig {
            enabled: true,
            app_url: "https://app.example.com/".into(),
            ..MailConfig::default()
        };
        let mailer = Mailer::from_config(&mail, &GeneralConfig::default()).unwrap();
        assert!(matches!(mailer.delivery(), Delivery::Log));
        assert_eq!(mailer.app_url(), "https://app.example.com");
    }

    #[test]
    fn enabled_with_api_uses_http() {
        let mail = MailConfig {
            enabled: true,
            api_url: "https://mail.example.com/send".into(),
            api_key: "key".into(),
            ..MailConfig::default()
        };
        let mailer = Mailer::from_config(&mail, &GeneralConfig::default()).unwrap();
        assert!(matches!(mailer.delivery(), Delivery::Http(_)));
    }

    #[tokio::test]
    async fn invalid_recipient_is_rejected() {
        let result = Mailer::disabled()
            .send("not-an-address", &Message::Welcome { name: "Ada" })
            .await;
        assert!(matches!(result, Err(MailError::InvalidRecipient(_))));
    }

    #[tokio::test]
    async fn log_delivery_succeeds() {
        let mailer = Mailer::new(Delivery::Log, "ops@vest.local", "USD");
        mailer
            .send("ada@example.com", &Message::Welcome { name: "Ada" })
            .await
            .unwrap();
    }
}
