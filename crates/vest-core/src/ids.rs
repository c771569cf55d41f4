//! ID prefixes for every persisted entity.
//!
//! IDs are `"{prefix}-{8 hex chars}"`, generated by the database layer.

pub const PREFIX_USER: &str = "usr";
pub const PREFIX_KYC: &str = "kyc";
pub const PREFIX_INDEX: &str = "idx";
pub const PREFIX_PAYMENT: &str = "pay";
pub const PREFIX_INVESTMENT: &str = "inv";
pub const PREFIX_RETURN: &str = "ret";
pub const PREFIX_DISTRIBUTION: &str = "dst";
pub const PREFIX_WITHDRAWAL: &str = "wdr";
pub const PREFIX_AUDIT: &str = "aud";
pub const PREFIX_RESET: &str = "rst";

pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_USER,
    PREFIX_KYC,
    PREFIX_INDEX,
    PREFIX_PAYMENT,
    PREFIX_INVESTMENT,
    PREFIX_RETURN,
    PREFIX_DISTRIBUTION,
    PREFIX_WITHDRAWAL,
    PREFIX_AUDIT,
    PREFIX_RESET,
];
