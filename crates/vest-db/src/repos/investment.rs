//! Investment repository: holdings, return history, and weekly distribution.

use chrono::{DateTime, Utc};

use vest_core::audit_detail::{DistributedDetail, StatusChangedDetail};
use vest_core::entities::{Distribution, Investment, ReturnEntry};
use vest_core::enums::{AuditAction, EntityType, IndexStatus, InvestmentStatus};
use vest_core::ids::{PREFIX_DISTRIBUTION, PREFIX_INVESTMENT, PREFIX_RETURN};
use vest_core::money::{BPS_SCALE, compute_return};
use vest_core::period::Period;
use vest_core::responses::{DistributionReport, InvestmentDetail, ReturnCredit};

use crate::error::{DatabaseError, conflict_on_unique};
use crate::helpers::{
    get_opt_string, get_u32, opt_text, parse_datetime, parse_enum, parse_optional_datetime,
    parse_period,
};
use crate::service::VestService;

const SELECT_COLS: &str = "id, user_id, index_id, payment_id, amount_cents, total_returns_cents, \
     status, created_at, closed_at";

const RETURN_COLS: &str =
    "id, investment_id, distribution_id, period, rate_bps, amount_cents, created_at";

const DISTRIBUTION_COLS: &str = "id, index_id, period, rate_bps, investment_count, \
     total_amount_cents, distributed_by, created_at";

fn row_to_investment(row: &libsql::Row) -> Result<Investment, DatabaseError> {
    Ok(Investment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        index_id: row.get(2)?,
        payment_id: get_opt_string(row, 3)?,
        amount_cents: row.get(4)?,
        total_returns_cents: row.get(5)?,
        status: parse_enum(&row.get::<String>(6)?)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
        closed_at: parse_optional_datetime(get_opt_string(row, 8)?.as_deref())?,
    })
}

pub(crate) fn row_to_return(row: &libsql::Row) -> Result<ReturnEntry, DatabaseError> {
    Ok(ReturnEntry {
        id: row.get(0)?,
        investment_id: row.get(1)?,
        distribution_id: row.get(2)?,
        period: parse_period(&row.get::<String>(3)?)?,
        rate_bps: row.get(4)?,
        amount_cents: row.get(5)?,
        created_at: parse_datetime(&row.get::<String>(6)?)?,
    })
}

fn row_to_distribution(row: &libsql::Row) -> Result<Distribution, DatabaseError> {
    Ok(Distribution {
        id: row.get(0)?,
        index_id: row.get(1)?,
        period: parse_period(&row.get::<String>(2)?)?,
        rate_bps: row.get(3)?,
        investment_count: get_u32(row, 4)?,
        total_amount_cents: row.get(5)?,
        distributed_by: row.get(6)?,
        created_at: parse_datetime(&row.get::<String>(7)?)?,
    })
}

/// Check a distribution rate: non-zero and within ±100 %.
///
/// # Errors
///
/// Returns `DatabaseError::Validation` otherwise.
pub fn validate_rate(rate_bps: i64) -> Result<(), DatabaseError> {
    if rate_bps == 0 {
        return Err(DatabaseError::Validation("rate must not be zero".into()));
    }
    if rate_bps.abs() > BPS_SCALE {
        return Err(DatabaseError::Validation(format!(
            "rate {rate_bps} bp is outside ±{BPS_SCALE} bp"
        )));
    }
    Ok(())
}

impl VestService {
    /// Insert an `active` investment. Must run inside a write transaction.
    pub(crate) async fn insert_investment_inner(
        &self,
        user_id: &str,
        index_id: &str,
        payment_id: Option<&str>,
        amount_cents: i64,
        at: DateTime<Utc>,
    ) -> Result<Investment, DatabaseError> {
        let id = self.db().generate_id(PREFIX_INVESTMENT).await?;
        self.db()
            .conn()
            .execute(
                &format!(
                    "INSERT INTO investments ({SELECT_COLS})
                     VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, NULL)"
                ),
                libsql::params![
                    id.as_str(),
                    user_id,
                    index_id,
                    opt_text(payment_id),
                    amount_cents,
                    InvestmentStatus::Active.as_str(),
                    at.to_rfc3339()
                ],
            )
            .await
            .map_err(|e| conflict_on_unique(e, || "payment already has an investment".into()))?;

        self.audit(
            None,
            EntityType::Investment,
            &id,
            AuditAction::Created,
            payment_id.map(|p| serde_json::json!({ "payment_id": p })),
            at,
        )
        .await?;

        Ok(Investment {
            id,
            user_id: user_id.to_string(),
            index_id: index_id.to_string(),
            payment_id: payment_id.map(String::from),
            amount_cents,
            total_returns_cents: 0,
            status: InvestmentStatus::Active,
            created_at: at,
            closed_at: None,
        })
    }

    /// # Errors
    ///
    /// `NotFound` when no investment has this id.
    pub async fn get_investment(&self, id: &str) -> Result<Investment, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM investments WHERE id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("investment", id))?;
        row_to_investment(&row)
    }

    /// A user's investments, active first, newest first within each status.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_investments_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Investment>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM investments WHERE user_id = ?1
                     ORDER BY status = 'active' DESC, created_at DESC, rowid DESC"
                ),
                [user_id],
            )
            .await?;
        let mut investments = Vec::new();
        while let Some(row) = rows.next().await? {
            investments.push(row_to_investment(&row)?);
        }
        Ok(investments)
    }

    /// Return entries credited to an investment, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn return_history(&self, investment_id: &str) -> Result<Vec<ReturnEntry>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {RETURN_COLS} FROM return_entries WHERE investment_id = ?1
                     ORDER BY period DESC, rowid DESC"
                ),
                [investment_id],
            )
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(row_to_return(&row)?);
        }
        Ok(entries)
    }

    /// An investment with its index name and full return history.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id.
    pub async fn investment_detail(&self, id: &str) -> Result<InvestmentDetail, DatabaseError> {
        let investment = self.get_investment(id).await?;
        let index = self.get_index(&investment.index_id).await?;
        let returns = self.return_history(id).await?;
        Ok(InvestmentDetail {
            investment,
            index_name: index.name,
            returns,
        })
    }

    /// Close an active investment. Closed investments receive no further returns.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidState` when already closed.
    pub async fn close_investment(
        &self,
        actor_id: &str,
        id: &str,
    ) -> Result<Investment, DatabaseError> {
        self.write(|| async move {
            let current = self.get_investment(id).await?;
            if !current.status.can_transition_to(InvestmentStatus::Closed) {
                return Err(DatabaseError::InvalidState(format!(
                    "investment {id} is already {}",
                    current.status
                )));
            }

            let now = Utc::now();
            self.db()
                .conn()
                .execute(
                    "UPDATE investments SET status = ?1, closed_at = ?2 WHERE id = ?3",
                    libsql::params![InvestmentStatus::Closed.as_str(), now.to_rfc3339(), id],
                )
                .await?;

            let detail = StatusChangedDetail {
                from: current.status.as_str().to_string(),
                to: InvestmentStatus::Closed.as_str().to_string(),
                reason: None,
            };
            self.audit(
                Some(actor_id),
                EntityType::Investment,
                id,
                AuditAction::StatusChanged,
                Some(serde_json::to_value(&detail)?),
                now,
            )
            .await?;

            tracing::info!(investment_id = id, "investment closed");
            Ok(Investment {
                status: InvestmentStatus::Closed,
                closed_at: Some(now),
                ..current
            })
        })
        .await
    }

    /// Credit one week of returns to every active investment in an index.
    ///
    /// Runs as a single write transaction: the distribution record, every
    /// investment total, every return entry, the index's last-rate fields and
    /// the audit entry commit together or not at all. A second run for the
    /// same `(index, period)` fails with `Conflict`. An index with no active
    /// investments still records the distribution.
    ///
    /// # Errors
    ///
    /// `Validation` for a zero or out-of-range rate, `NotFound` for an unknown
    /// index, `InvalidState` unless the index is active, `Conflict` when the
    /// period was already distributed.
    pub async fn distribute_returns(
        &self,
        actor_id: &str,
        index_id: &str,
        rate_bps: i64,
        period: Option<Period>,
    ) -> Result<DistributionReport, DatabaseError> {
        validate_rate(rate_bps)?;
        let period = period.unwrap_or_else(Period::current);
        let period_str = period.to_string();

        self.write(|| async move {
            let index = self.get_index(index_id).await?;
            if index.status != IndexStatus::Active {
                return Err(DatabaseError::InvalidState(format!(
                    "index {} is {}; only active indices receive returns",
                    index.name, index.status
                )));
            }
            if self.find_distribution(index_id, period).await?.is_some() {
                return Err(DatabaseError::Conflict(format!(
                    "returns for {} in {period} were already distributed",
                    index.name
                )));
            }

            let mut rows = self
                .db()
                .conn()
                .query(
                    &format!(
                        "SELECT {SELECT_COLS} FROM investments
                         WHERE index_id = ?1 AND status = 'active'
                         ORDER BY created_at, rowid"
                    ),
                    [index_id],
                )
                .await?;
            let mut investments = Vec::new();
            while let Some(row) = rows.next().await? {
                investments.push(row_to_investment(&row)?);
            }

            let mut credits = Vec::with_capacity(investments.len());
            let mut total_amount_cents: i64 = 0;
            for inv in &investments {
                let amount_cents = compute_return(inv.amount_cents, rate_bps);
                let total_returns_cents = inv
                    .total_returns_cents
                    .checked_add(amount_cents)
                    .ok_or_else(|| {
                        DatabaseError::Validation(format!("returns overflow on investment {}", inv.id))
                    })?;
                total_amount_cents = total_amount_cents
                    .checked_add(amount_cents)
                    .ok_or_else(|| DatabaseError::Validation("distribution total overflows".into()))?;
                credits.push(ReturnCredit {
                    investment_id: inv.id.clone(),
                    user_id: inv.user_id.clone(),
                    amount_cents,
                    total_returns_cents,
                });
            }

            let now = Utc::now();
            let investment_count = u32::try_from(credits.len())
                .map_err(|_| DatabaseError::Validation("too many investments".into()))?;
            let distribution = Distribution {
                id: self.db().generate_id(PREFIX_DISTRIBUTION).await?,
                index_id: index_id.to_string(),
                period,
                rate_bps,
                investment_count,
                total_amount_cents,
                distributed_by: actor_id.to_string(),
                created_at: now,
            };

            self.db()
                .conn()
                .execute(
                    &format!(
                        "INSERT INTO distributions ({DISTRIBUTION_COLS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                    ),
                    libsql::params![
                        distribution.id.as_str(),
                        index_id,
                        period_str.as_str(),
                        rate_bps,
                        i64::from(investment_count),
                        total_amount_cents,
                        actor_id,
                        now.to_rfc3339()
                    ],
                )
                .await
                .map_err(|e| {
                    conflict_on_unique(e, || format!("returns for {period} were already distributed"))
                })?;

            for credit in &credits {
                self.db()
                    .conn()
                    .execute(
                        "UPDATE investments SET total_returns_cents = ?1 WHERE id = ?2",
                        libsql::params![credit.total_returns_cents, credit.investment_id.as_str()],
                    )
                    .await?;

                let return_id = self.db().generate_id(PREFIX_RETURN).await?;
                self.db()
                    .conn()
                    .execute(
                        &format!(
                            "INSERT INTO return_entries ({RETURN_COLS})
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
                        ),
                        libsql::params![
                            return_id.as_str(),
                            credit.investment_id.as_str(),
                            distribution.id.as_str(),
                            period_str.as_str(),
                            rate_bps,
                            credit.amount_cents,
                            now.to_rfc3339()
                        ],
                    )
                    .await?;
            }

            self.db()
                .conn()
                .execute(
                    "UPDATE indices SET last_rate_bps = ?1, last_distributed_at = ?2, updated_at = ?2
                     WHERE id = ?3",
                    libsql::params![rate_bps, now.to_rfc3339(), index_id],
                )
                .await?;

            let detail = DistributedDetail {
                distribution_id: distribution.id.clone(),
                period: period_str.clone(),
                rate_bps,
                investment_count,
                total_amount_cents,
            };
            self.audit(
                Some(actor_id),
                EntityType::Distribution,
                &distribution.id,
                AuditAction::Distributed,
                Some(serde_json::to_value(&detail)?),
                now,
            )
            .await?;

            tracing::info!(
                index_id,
                distribution_id = %distribution.id,
                period = %period,
                rate_bps,
                investment_count,
                total_amount_cents,
                "returns distributed"
            );

            Ok(DistributionReport {
                distribution,
                index_name: index.name,
                credits,
            })
        })
        .await
    }

    /// The distribution for `(index, period)`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn find_distribution(
        &self,
        index_id: &str,
        period: Period,
    ) -> Result<Option<Distribution>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {DISTRIBUTION_COLS} FROM distributions WHERE index_id = ?1 AND period = ?2"
                ),
                libsql::params![index_id, period.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_distribution(&row)?)),
            None => Ok(None),
        }
    }

    /// Distribution history of an index, newest period first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_distributions(&self, index_id: &str) -> Result<Vec<Distribution>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {DISTRIBUTION_COLS} FROM distributions WHERE index_id = ?1
                     ORDER BY period DESC"
                ),
                [index_id],
            )
            .await?;
        let mut distributions = Vec::new();
        while let Some(row) = rows.next().await? {
            distributions.push(row_to_distribution(&row)?);
        }
        Ok(distributions)
    }
}
