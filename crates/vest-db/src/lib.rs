//! # vest-db
//!
//! libSQL persistence and domain operations for Vest.
//!
//! Holds every relational record: users, KYC submissions, indices, payment
//! requests, investments, weekly distributions with their return entries,
//! withdrawals, and the audit trail. Domain operations live on
//! [`service::VestService`]; this module owns the raw connection and the
//! write gate that serializes mutations.

pub mod error;
pub mod helpers;
mod migrations;
pub mod repos;
pub mod service;
pub mod updates;

#[cfg(test)]
mod test_support;

pub use migrations::TABLES;

use error::DatabaseError;
use libsql::Builder;
use tokio::sync::{Mutex, MutexGuard};

/// How long a local write waits on a lock held by another process
/// (the CLI and the server share one database file).
pub const BUSY_TIMEOUT_MS: u32 = 5_000;

/// Central database handle.
///
/// Wraps a libSQL database, a single connection, and the write gate. Every
/// mutation goes through [`VestDb::begin_write`], so at most one write
/// transaction is open at any time.
pub struct VestDb {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
    write_gate: Mutex<()>,
    remote: bool,
}

/// An open `BEGIN IMMEDIATE` transaction holding the write gate.
///
/// Dropping it without [`WriteTxn::commit`] or [`WriteTxn::rollback`] leaves
/// the transaction open; the next [`VestDb::begin_write`] rolls it back.
pub struct WriteTxn<'a> {
    _permit: MutexGuard<'a, ()>,
    conn: &'a libsql::Connection,
}

impl VestDb {
    /// Open a local database at the given path (`":memory:"` for tests).
    ///
    /// Runs migrations automatically on open.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened or
    /// migrations fail.
    pub async fn open_local(path: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;
        Self::init(db, conn, false).await
    }

    /// Open a remote libSQL database (e.g., Turso).
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the connection cannot be established or
    /// migrations fail.
    pub async fn open_remote(url: &str, auth_token: &str) -> Result<Self, DatabaseError> {
        let db = Builder::new_remote(url.to_string(), auth_token.to_string())
            .build()
            .await?;
        let conn = db.connect()?;
        Self::init(db, conn, true).await
    }

    async fn init(
        db: libsql::Database,
        conn: libsql::Connection,
        remote: bool,
    ) -> Result<Self, DatabaseError> {
        // Per-connection in SQLite.
        conn.execute("PRAGMA foreign_keys = ON", ())
            .await
            .map_err(|e| DatabaseError::Migration(format!("PRAGMA foreign_keys: {e}")))?;
        if !remote {
            // Returns the new value as a row, so it goes through `query`.
            let pragma_err =
                |e: libsql::Error| DatabaseError::Migration(format!("PRAGMA busy_timeout: {e}"));
            let mut rows = conn
                .query(&format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"), ())
                .await
                .map_err(pragma_err)?;
            rows.next().await.map_err(pragma_err)?;
        }

        let vest_db = Self {
            db,
            conn,
            write_gate: Mutex::new(()),
            remote,
        };
        vest_db.run_migrations().await?;
        Ok(vest_db)
    }

    /// Access the underlying libSQL connection for direct queries.
    #[must_use]
    pub const fn conn(&self) -> &libsql::Connection {
        &self.conn
    }

    #[must_use]
    pub const fn is_remote(&self) -> bool {
        self.remote
    }

    /// Generate a prefixed ID via libSQL. Returns e.g., `"inv-a3f8b2c1"`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails or returns no rows.
    pub async fn generate_id(&self, prefix: &str) -> Result<String, DatabaseError> {
        let mut rows = self
            .conn
            .query("SELECT ?1 || '-' || lower(hex(randomblob(4)))", [prefix])
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<String>(0)?)
    }

    /// Take the write gate and open a `BEGIN IMMEDIATE` transaction.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the transaction cannot be started.
    pub async fn begin_write(&self) -> Result<WriteTxn<'_>, DatabaseError> {
        let permit = self.write_gate.lock().await;

        if !self.conn.is_autocommit() {
            tracing::warn!("rolling back transaction abandoned by a cancelled write");
            self.conn.execute("ROLLBACK", ()).await?;
        }

        self.conn.execute("BEGIN IMMEDIATE", ()).await?;
        Ok(WriteTxn {
            _permit: permit,
            conn: &self.conn,
        })
    }

    /// List the user tables present in the database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the catalog query fails.
    pub async fn table_names(&self) -> Result<Vec<String>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
                (),
            )
            .await?;
        let mut names = Vec::new();
        while let Some(row) = rows.next().await? {
            names.push(row.get::<String>(0)?);
        }
        Ok(names)
    }
}

impl WriteTxn<'_> {
    /// Commit and release the write gate.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if `COMMIT` fails; the transaction is then rolled back.
    pub async fn commit(self) -> Result<(), DatabaseError> {
        if let Err(e) = self.conn.execute("COMMIT", ()).await {
            self.rollback().await;
            return Err(e.into());
        }
        Ok(())
    }

    /// Roll back and release the write gate. Failures are logged.
    pub async fn rollback(self) {
        if let Err(e) = self.conn.execute("ROLLBACK", ()).await {
            tracing::warn!(error = %e, "rollback failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    async fn test_db() -> VestDb {
        VestDb::open_local(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn open_local_creates_schema() {
        let db = test_db().await;
        let names = db.table_names().await.unwrap();
        for table in TABLES {
            assert!(names.iter().any(|n| n == table), "table '{table}' should exist");
        }
    }

    #[tokio::test]
    async fn local_connection_waits_on_busy_locks() {
        let db = test_db().await;
        let mut rows = db.conn().query("PRAGMA busy_timeout", ()).await.unwrap();
        let timeout: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(timeout, i64::from(BUSY_TIMEOUT_MS));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn second_handle_waits_for_lock_instead_of_failing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("vest.db");
        let path = path.to_str().unwrap();
        let server = std::sync::Arc::new(VestDb::open_local(path).await.unwrap());
        let cron = VestDb::open_local(path).await.unwrap();

        let (locked_tx, locked_rx) = tokio::sync::oneshot::channel();
        let holder = tokio::spawn(async move {
            let tx = server.begin_write().await.unwrap();
            locked_tx.send(()).unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            tx.commit().await.unwrap();
        });

        locked_rx.await.unwrap();
        let tx = cron.begin_write().await.unwrap();
        tx.commit().await.unwrap();
        holder.await.unwrap();
    }

    #[tokio::test]
    async fn generate_id_correct_format() {
        let db = test_db().await;
        let id = db.generate_id("inv").await.unwrap();
        assert!(id.starts_with("inv-"), "ID should start with 'inv-': {id}");
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn generate_id_all_prefixes() {
        let db = test_db().await;
        for prefix in vest_core::ids::ALL_PREFIXES {
            let id = db.generate_id(prefix).await.unwrap();
            assert!(id.starts_with(&format!("{prefix}-")));
        }
    }

    #[tokio::test]
    async fn generate_id_uniqueness() {
        let db = test_db().await;
        let mut ids = HashSet::new();
        for _ in 0..100 {
            let id = db.generate_id("tst").await.unwrap();
            assert!(ids.insert(id.clone()), "Duplicate ID generated: {id}");
        }
    }

    #[tokio::test]
    async fn idempotent_migrations() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn distributions_unique_per_index_and_period() {
        let db = test_db().await;
        db.conn()
            .execute_batch(
                "INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
                 VALUES ('usr-1', 'Admin', 'a@x.io', 'h', 't', 't');
                 INSERT INTO indices (id, name, slug, risk_level, min_investment_cents, target_weekly_rate_bps, created_at, updated_at)
                 VALUES ('idx-1', 'Tech', 'tech', 'low', 100, 200, 't', 't');
                 INSERT INTO distributions (id, index_id, period, rate_bps, investment_count, total_amount_cents, distributed_by, created_at)
                 VALUES ('dst-1', 'idx-1', '2026-W42', 200, 0, 0, 'usr-1', 't');",
            )
            .await
            .unwrap();

        let result = db
            .conn()
            .execute(
                "INSERT INTO distributions (id, index_id, period, rate_bps, investment_count, total_amount_cents, distributed_by, created_at)
                 VALUES ('dst-2', 'idx-1', '2026-W42', 300, 0, 0, 'usr-1', 't')",
                (),
            )
            .await;
        assert!(result.is_err(), "second distribution for the same week must fail");
    }

    #[tokio::test]
    async fn write_txn_rollback_discards_changes() {
        let db = test_db().await;
        let tx = db.begin_write().await.unwrap();
        db.conn()
            .execute(
                "INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
                 VALUES ('usr-x', 'X', 'x@x.io', 'h', 't', 't')",
                (),
            )
            .await
            .unwrap();
        tx.rollback().await;

        let mut rows = db
            .conn()
            .query("SELECT COUNT(*) FROM users", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn abandoned_txn_is_rolled_back_on_next_write() {
        let db = test_db().await;
        {
            let _tx = db.begin_write().await.unwrap();
            db.conn()
                .execute(
                    "INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
                     VALUES ('usr-y', 'Y', 'y@x.io', 'h', 't', 't')",
                    (),
                )
                .await
                .unwrap();
            // dropped without commit
        }
        assert!(!db.conn().is_autocommit());

        let tx = db.begin_write().await.unwrap();
        tx.commit().await.unwrap();

        let mut rows = db
            .conn()
            .query("SELECT COUNT(*) FROM users", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 0);
    }
}
