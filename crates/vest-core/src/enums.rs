//! Status enums, roles, and audit vocabulary for Vest.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`,
//! and the same string is stored in SQL. Status enums with state machines provide
//! `allowed_next_states()` to enforce valid transitions at the service layer.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Return the string representation used in SQL storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// KycStatus
// ---------------------------------------------------------------------------

/// Verification state of a user account.
///
/// ```text
/// not_submitted → pending → approved
///                         → rejected → pending (resubmission)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum KycStatus {
    NotSubmitted,
    Pending,
    Approved,
    Rejected,
}

impl KycStatus {
    /// Valid next states from the current state.
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::NotSubmitted | Self::Rejected => &[Self::Pending],
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved => &[],
        }
    }

    /// Check whether transitioning to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotSubmitted => "not_submitted",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReviewStatus
// ---------------------------------------------------------------------------

/// Review state shared by KYC submissions and payment requests.
///
/// ```text
/// pending → approved
///         → rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved | Self::Rejected => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// IdDocumentType
// ---------------------------------------------------------------------------

/// Kind of government ID attached to a KYC submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IdDocumentType {
    Passport,
    NationalId,
    DriversLicense,
}

impl IdDocumentType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Passport => "passport",
            Self::NationalId => "national_id",
            Self::DriversLicense => "drivers_license",
        }
    }
}

impl fmt::Display for IdDocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// IndexStatus
// ---------------------------------------------------------------------------

/// Lifecycle of an investable index.
///
/// ```text
/// active ⇄ paused
/// active | paused → archived
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Active,
    Paused,
    Archived,
}

impl IndexStatus {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Active => &[Self::Paused, Self::Archived],
            Self::Paused => &[Self::Active, Self::Archived],
            Self::Archived => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RiskLevel
// ---------------------------------------------------------------------------

/// Advertised risk band of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PaymentMethod
// ---------------------------------------------------------------------------

/// Channel used for an offline payment or a withdrawal payout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    MobileMoney,
    Cash,
    Crypto,
}

impl PaymentMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BankTransfer => "bank_transfer",
            Self::MobileMoney => "mobile_money",
            Self::Cash => "cash",
            Self::Crypto => "crypto",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// InvestmentStatus
// ---------------------------------------------------------------------------

/// Status of a holding. Only `active` investments receive returns.
///
/// ```text
/// active → closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentStatus {
    Active,
    Closed,
}

impl InvestmentStatus {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Active => &[Self::Closed],
            Self::Closed => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for InvestmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WithdrawalStatus
// ---------------------------------------------------------------------------

/// Status of a withdrawal request.
///
/// ```text
/// pending → approved → paid
///         → rejected
/// approved → rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
}

impl WithdrawalStatus {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Pending => &[Self::Approved, Self::Rejected],
            Self::Approved => &[Self::Paid, Self::Rejected],
            Self::Paid | Self::Rejected => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Whether a withdrawal in this state holds funds against the balance.
    #[must_use]
    pub const fn reserves_funds(self) -> bool {
        !matches!(self, Self::Rejected)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityType
// ---------------------------------------------------------------------------

/// Entity kinds recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    User,
    Kyc,
    Index,
    Payment,
    Investment,
    Distribution,
    Withdrawal,
}

impl EntityType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Kyc => "kyc",
            Self::Index => "index",
            Self::Payment => "payment",
            Self::Investment => "investment",
            Self::Distribution => "distribution",
            Self::Withdrawal => "withdrawal",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditAction
// ---------------------------------------------------------------------------

/// Mutation kinds recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Created,
    Updated,
    StatusChanged,
    RoleChanged,
    PasswordChanged,
    ProofAttached,
    Distributed,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::StatusChanged => "status_changed",
            Self::RoleChanged => "role_changed",
            Self::PasswordChanged => "password_changed",
            Self::ProofAttached => "proof_attached",
            Self::Distributed => "distributed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn kyc_resubmission_only_after_rejection() {
        assert!(KycStatus::NotSubmitted.can_transition_to(KycStatus::Pending));
        assert!(KycStatus::Rejected.can_transition_to(KycStatus::Pending));
        assert!(!KycStatus::Approved.can_transition_to(KycStatus::Pending));
        assert!(!KycStatus::Pending.can_transition_to(KycStatus::Pending));
    }

    #[test]
    fn review_is_single_shot() {
        assert!(ReviewStatus::Pending.can_transition_to(ReviewStatus::Approved));
        assert!(ReviewStatus::Approved.allowed_next_states().is_empty());
        assert!(ReviewStatus::Rejected.allowed_next_states().is_empty());
    }

    #[test]
    fn archived_index_is_terminal() {
        assert!(IndexStatus::Active.can_transition_to(IndexStatus::Paused));
        assert!(IndexStatus::Paused.can_transition_to(IndexStatus::Active));
        assert!(IndexStatus::Archived.allowed_next_states().is_empty());
    }

    #[test]
    fn withdrawal_transitions() {
        assert!(WithdrawalStatus::Pending.can_transition_to(WithdrawalStatus::Approved));
        assert!(WithdrawalStatus::Approved.can_transition_to(WithdrawalStatus::Paid));
        assert!(WithdrawalStatus::Approved.can_transition_to(WithdrawalStatus::Rejected));
        assert!(!WithdrawalStatus::Pending.can_transition_to(WithdrawalStatus::Paid));
        assert!(!WithdrawalStatus::Paid.can_transition_to(WithdrawalStatus::Rejected));
    }

    #[test]
    fn only_rejected_withdrawals_release_funds() {
        assert!(WithdrawalStatus::Pending.reserves_funds());
        assert!(WithdrawalStatus::Approved.reserves_funds());
        assert!(WithdrawalStatus::Paid.reserves_funds());
        assert!(!WithdrawalStatus::Rejected.reserves_funds());
    }

    #[test]
    fn serde_matches_as_str() {
        let json = serde_json::to_string(&KycStatus::NotSubmitted).unwrap();
        assert_eq!(json, "\"not_submitted\"");
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, format!("\"{}\"", PaymentMethod::BankTransfer.as_str()));
        let json = serde_json::to_string(&AuditAction::StatusChanged).unwrap();
        assert_eq!(json, "\"status_changed\"");
    }
}
