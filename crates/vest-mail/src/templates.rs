//! Email templates.
//!
//! Every interpolated value is user- or admin-supplied, so the HTML body
//! escapes all of them; the plain-text body does not.

use std::fmt::Write as _;

use serde::Serialize;
use vest_core::enums::WithdrawalStatus;
use vest_core::money::format_cents;
use vest_core::period::Period;

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// An account event that warrants an email.
#[derive(Debug, Clone)]
pub enum Message<'a> {
    Welcome {
        name: &'a str,
    },
    KycApproved {
        name: &'a str,
    },
    KycRejected {
        name: &'a str,
        reason: &'a str,
    },
    PaymentApproved {
        name: &'a str,
        index: &'a str,
        amount_cents: i64,
    },
    PaymentRejected {
        name: &'a str,
        reason: &'a str,
    },
    ReturnsCredited {
        name: &'a str,
        index: &'a str,
        amount_cents: i64,
        period: Period,
    },
    WithdrawalStatus {
        name: &'a str,
        status: WithdrawalStatus,
        amount_cents: i64,
        reason: Option<&'a str>,
    },
    PasswordReset {
        name: &'a str,
        link: &'a str,
    },
}

/// Escape `&`, `<`, `>`, `"` and `'` for HTML text and attribute values.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// A piece of body text: either literal template copy or a value to escape.
enum Part<'a> {
    Copy(&'a str),
    Value(String),
}

struct Body<'a> {
    greeting_name: &'a str,
    paragraphs: Vec<Vec<Part<'a>>>,
    link: Option<&'a str>,
}

impl Body<'_> {
    fn text(&self) -> String {
        let mut out = format!("Hello {},\n\n", self.greeting_name);
        for paragraph in &self.paragraphs {
            for part in paragraph {
                match part {
                    Part::Copy(s) => out.push_str(s),
                    Part::Value(s) => out.push_str(s),
                }
            }
            out.push_str("\n\n");
        }
        if let Some(link) = self.link {
            let _ = write!(out, "{link}\n\n");
        }
        out.push_str("The Vest team\n");
        out
    }

    fn html(&self) -> String {
        let mut out = format!("<p>Hello {},</p>\n", escape_html(self.greeting_name));
        for paragraph in &self.paragraphs {
            out.push_str("<p>");
            for part in paragraph {
                match part {
                    Part::Copy(s) => out.push_str(s),
                    Part::Value(s) => out.push_str(&escape_html(s)),
                }
            }
            out.push_str("</p>\n");
        }
        if let Some(link) = self.link {
            let link = escape_html(link);
            let _ = writeln!(out, "<p><a href=\"{link}\">{link}</a></p>");
        }
        out.push_str("<p>The Vest team</p>\n");
        out
    }
}

impl Message<'_> {
    /// Short machine name, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Welcome { .. } => "welcome",
            Self::KycApproved { .. } => "kyc_approved",
            Self::KycRejected { .. } => "kyc_rejected",
            Self::PaymentApproved { .. } => "payment_approved",
            Self::PaymentRejected { .. } => "payment_rejected",
            Self::ReturnsCredited { .. } => "returns_credited",
            Self::WithdrawalStatus { .. } => "withdrawal_status",
            Self::PasswordReset { .. } => "password_reset",
        }
    }

    /// Render with amounts shown in `currency` (an ISO code such as `USD`).
    #[must_use]
    pub fn render(&self, currency: &str) -> Email {
        let money = |cents: i64| format!("{currency} {}", format_cents(cents));

        let (subject, body) = match self {
            Self::Welcome { name } => (
                "Welcome to Vest".to_string(),
                Body {
                    greeting_name: *name,
                    paragraphs: vec![
                        vec![Part::Copy("Your account is ready.")],
                        vec![Part::Copy(
                            "Complete identity verification to start investing.",
                        )],
                    ],
                    link: None,
                },
            ),
            Self::KycApproved { name } => (
                "Your identity has been verified".to_string(),
                Body {
                    greeting_name: *name,
                    paragraphs: vec![vec![Part::Copy(
                        "Your identity verification was approved. You can now invest in any active index.",
                    )]],
                    link: None,
                },
            ),
            Self::KycRejected { name, reason } => (
                "Identity verification needs attention".to_string(),
                Body {
                    greeting_name: *name,
                    paragraphs: vec![
                        vec![Part::Copy("We could not verify your identity: "), Part::Value((*reason).to_string())],
                        vec![Part::Copy("You can correct the details and submit again.")],
                    ],
                    link: None,
                },
            ),
            Self::PaymentApproved {
                name,
                index,
                amount_cents,
            } => (
                format!("Payment confirmed: {index}"),
                Body {
                    greeting_name: *name,
                    paragraphs: vec![vec![
                        Part::Copy("We received your payment of "),
                        Part::Value(money(*amount_cents)),
                        Part::Copy(". It is now invested in "),
                        Part::Value((*index).to_string()),
                        Part::Copy("."),
                    ]],
                    link: None,
                },
            ),
            Self::PaymentRejected { name, reason } => (
                "Payment could not be confirmed".to_string(),
                Body {
                    greeting_name: *name,
                    paragraphs: vec![vec![
                        Part::Copy("We could not match your payment: "),
                        Part::Value((*reason).to_string()),
                    ]],
                    link: None,
                },
            ),
            Self::ReturnsCredited {
                name,
                index,
                amount_cents,
                period,
            } => (
                format!("Weekly returns for {period}"),
                Body {
                    greeting_name: *name,
                    paragraphs: vec![vec![
                        Part::Value(money(*amount_cents)),
                        Part::Copy(" was credited to your "),
                        Part::Value((*index).to_string()),
                        Part::Copy(" investment for "),
                        Part::Value(period.to_string()),
                        Part::Copy("."),
                    ]],
                    link: None,
                },
            ),
            Self::WithdrawalStatus {
                name,
                status,
                amount_cents,
                reason,
            } => {
                let mut paragraphs = vec![vec![
                    Part::Copy("Your withdrawal of "),
                    Part::Value(money(*amount_cents)),
                    Part::Copy(" is now "),
                    Part::Value(status.to_string()),
                    Part::Copy("."),
                ]];
                if let Some(reason) = reason {
                    paragraphs.push(vec![Part::Copy("Reason: "), Part::Value((*reason).to_string())]);
                }
                (
                    format!("Withdrawal {status}"),
                    Body {
                        greeting_name: *name,
                        paragraphs,
                        link: None,
                    },
                )
            }
            Self::PasswordReset { name, link } => (
                "Reset your Vest password".to_string(),
                Body {
                    greeting_name: *name,
                    paragraphs: vec![
                        vec![Part::Copy("Use the link below to choose a new password.")],
                        vec![Part::Copy("If you did not ask for this, ignore this email.")],
                    ],
                    link: Some(link),
                },
            ),
        };

        Email {
            subject,
            text: body.text(),
            html: body.html(),
        }
    }
}
