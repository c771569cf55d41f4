//! # vest-core
//!
//! Core types shared by every Vest crate.
//!
//! - Entity structs for the investment domain (users, KYC submissions,
//!   indices, payment requests, investments, distributions, withdrawals)
//! - Status enums with state machine transitions
//! - Money arithmetic on integer minor units and basis-point rates
//! - ISO week periods used to key return distributions
//! - ID prefix constants
//! - Cross-cutting error types and API response shapes

pub mod audit_detail;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod identity;
pub mod ids;
pub mod money;
pub mod period;
pub mod responses;
