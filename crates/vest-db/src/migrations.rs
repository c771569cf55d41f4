//! Database migration runner.
//!
//! Embeds the SQL migration files at compile time and executes them on
//! database open. All statements use `IF NOT EXISTS` for idempotent re-running.

use crate::VestDb;
use crate::error::DatabaseError;

/// Initial schema: 10 tables, 15 indexes.
const MIGRATION_001: &str = include_str!("../migrations/001_initial.sql");

/// Tables created by the migrations, in dependency order.
pub const TABLES: &[&str] = &[
    "users",
    "password_resets",
    "kyc_submissions",
    "indices",
    "payment_requests",
    "investments",
    "distributions",
    "return_entries",
    "withdrawals",
    "audit_trail",
];

impl VestDb {
    /// Run all embedded migrations in sequence.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Migration` naming the migration that failed.
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch(MIGRATION_001)
            .await
            .map_err(|e| DatabaseError::Migration(format!("001_initial: {e}")))?;
        Ok(())
    }
}
