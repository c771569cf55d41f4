//! Mail delivery errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    /// Transport failure talking to the mail API.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The mail API answered with a non-success status.
    #[error("mail API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The recipient address is empty or malformed.
    #[error("invalid recipient '{0}'")]
    InvalidRecipient(String),
}
