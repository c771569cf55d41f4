//! Entity structs for all Vest domain objects.
//!
//! Each entity maps to a table in the libSQL database (see
//! `vest-db/migrations/001_initial.sql`). All structs derive `Serialize`,
//! `Deserialize`, and `JsonSchema` for JSON APIs and schema validation.

mod audit;
mod distribution;
mod index;
mod investment;
mod kyc;
mod payment;
mod user;
mod withdrawal;

pub use audit::AuditEntry;
pub use distribution::{Distribution, ReturnEntry};
pub use index::Index;
pub use investment::Investment;
pub use kyc::KycSubmission;
pub use payment::PaymentRequest;
pub use user::User;
pub use withdrawal::Withdrawal;
