//! # vest-mail
//!
//! Transactional email for Vest: one template per account event, rendered
//! to subject, plain text and HTML, and a [`Mailer`] that delivers through
//! an HTTP mail API, logs instead, or drops messages entirely.

pub mod error;
pub mod mailer;
pub mod templates;

pub use error::MailError;
pub use mailer::Mailer;
pub use templates::{Email, Message};
