//! Service layer orchestrating database mutations with audit.
//!
//! `VestService` wraps `VestDb` (raw database access) plus the business
//! settings the domain rules need. All repo methods are implemented as
//! `impl VestService` blocks under [`crate::repos`].

use std::future::Future;

use chrono::{DateTime, Utc};
use vest_config::VestConfig;
use vest_core::entities::AuditEntry;
use vest_core::enums::{AuditAction, EntityType};
use vest_core::ids::PREFIX_AUDIT;
use vest_core::responses::Page;

use crate::VestDb;
use crate::error::DatabaseError;
use crate::helpers::{PageRequest, get_u64};

/// Default floor for withdrawal requests, in cents.
pub const DEFAULT_MIN_WITHDRAWAL_CENTS: i64 = 1_000;

/// Orchestrates database mutations with an audit trail.
///
/// Every mutation method follows this protocol:
/// 1. Take the write gate and `BEGIN IMMEDIATE`
/// 2. Read and check current state
/// 3. Execute SQL
/// 4. Append audit entry (inside the transaction)
/// 5. `COMMIT`, or `ROLLBACK` on any error
pub struct VestService {
    db: VestDb,
    min_withdrawal_cents: i64,
}

impl VestService {
    /// Create a service over a local database file, or `":memory:"` for tests.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new_local(db_path: &str) -> Result<Self, DatabaseError> {
        Ok(Self::from_db(VestDb::open_local(db_path).await?))
    }

    /// Create a service from the loaded configuration.
    ///
    /// Uses the remote database when `database.url` and `database.auth_token`
    /// are both set, otherwise the local `database.path`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn from_config(config: &VestConfig) -> Result<Self, DatabaseError> {
        let db = if config.database.is_configured() {
            tracing::info!(url = %config.database.url, "opening remote database");
            VestDb::open_remote(&config.database.url, &config.database.auth_token).await?
        } else {
            tracing::info!(path = %config.database.path, "opening local database");
            VestDb::open_local(&config.database.path).await?
        };
        Ok(Self::from_db(db).with_min_withdrawal_cents(config.general.min_withdrawal_cents))
    }

    /// Create from an existing `VestDb`.
    #[must_use]
    pub const fn from_db(db: VestDb) -> Self {
        Self {
            db,
            min_withdrawal_cents: DEFAULT_MIN_WITHDRAWAL_CENTS,
        }
    }

    #[must_use]
    pub const fn with_min_withdrawal_cents(mut self, cents: i64) -> Self {
        self.min_withdrawal_cents = cents;
        self
    }

    /// Access the underlying database handle.
    #[must_use]
    pub const fn db(&self) -> &VestDb {
        &self.db
    }

    #[must_use]
    pub const fn min_withdrawal_cents(&self) -> i64 {
        self.min_withdrawal_cents
    }

    /// Run `op` inside a write transaction, committing on `Ok` and rolling
    /// back on `Err`.
    ///
    /// `op` must not call another public mutation: the write gate is not reentrant.
    pub(crate) async fn write<T, F, Fut>(&self, op: F) -> Result<T, DatabaseError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DatabaseError>>,
    {
        let tx = self.db.begin_write().await?;
        match op().await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback().await;
                Err(err)
            }
        }
    }

    /// Build and append an audit entry. Must run inside [`Self::write`].
    pub(crate) async fn audit(
        &self,
        actor_id: Option<&str>,
        entity_type: EntityType,
        entity_id: &str,
        action: AuditAction,
        detail: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let id = self.db.generate_id(PREFIX_AUDIT).await?;
        self.append_audit(&AuditEntry {
            id,
            actor_id: actor_id.map(String::from),
            entity_type,
            entity_id: entity_id.to_string(),
            action,
            detail,
            created_at: at,
        })
        .await
    }

    /// Count rows with `count_sql` and fetch one page with `select_sql`.
    ///
    /// `select_sql` must end without `LIMIT`; the page bounds are appended.
    pub(crate) async fn fetch_page<T>(
        &self,
        select_sql: &str,
        count_sql: &str,
        params: Vec<libsql::Value>,
        page: PageRequest,
        map_row: fn(&libsql::Row) -> Result<T, DatabaseError>,
    ) -> Result<Page<T>, DatabaseError> {
        let mut rows = self
            .db
            .conn()
            .query(count_sql, libsql::params_from_iter(params.clone()))
            .await?;
        let total = match rows.next().await? {
            Some(row) => get_u64(&row, 0)?,
            None => 0,
        };

        let sql = format!(
            "{select_sql} LIMIT {} OFFSET {}",
            page.per_page,
            page.offset()
        );
        let mut rows = self
            .db
            .conn()
            .query(&sql, libsql::params_from_iter(params))
            .await?;
        let mut items = Vec::new();
        while let Some(row) = rows.next().await? {
            items.push(map_row(&row)?);
        }

        Ok(Page::new(items, page.page, page.per_page, total))
    }

    /// Run a single-value `COUNT`/`SUM` query.
    pub(crate) async fn scalar_i64(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<i64, DatabaseError> {
        let mut rows = self.db.conn().query(sql, params).await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(row.get::<i64>(0)?)
    }
}
