//! Repository modules implementing the domain operations.
//!
//! Each module adds methods to `VestService` via `impl VestService` blocks.

pub mod audit;
pub mod dashboard;
pub mod index;
pub mod investment;
pub mod kyc;
pub mod payment;
pub mod user;
pub mod withdrawal;
