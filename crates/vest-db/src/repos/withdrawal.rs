//! Withdrawal repository: balances and payout requests against credited returns.

use chrono::Utc;

use vest_core::audit_detail::StatusChangedDetail;
use vest_core::entities::Withdrawal;
use vest_core::enums::{AuditAction, EntityType, KycStatus, PaymentMethod, WithdrawalStatus};
use vest_core::ids::PREFIX_WITHDRAWAL;
use vest_core::money::format_cents;
use vest_core::responses::{Balance, Page};

use crate::error::DatabaseError;
use crate::helpers::{
    PageRequest, get_opt_string, opt_text, parse_datetime, parse_enum, parse_optional_datetime,
    require_text,
};
use crate::service::VestService;

const SELECT_COLS: &str = "id, user_id, amount_cents, method, destination, status, \
     rejection_reason, reviewed_by, created_at, updated_at, paid_at";

/// Input for [`VestService::request_withdrawal`].
#[derive(Debug, Clone)]
pub struct NewWithdrawal {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// Account number, wallet or phone the payout goes to.
    pub destination: String,
}

fn row_to_withdrawal(row: &libsql::Row) -> Result<Withdrawal, DatabaseError> {
    Ok(Withdrawal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount_cents: row.get(2)?,
        method: parse_enum(&row.get::<String>(3)?)?,
        destination: row.get(4)?,
        status: parse_enum(&row.get::<String>(5)?)?,
        rejection_reason: get_opt_string(row, 6)?,
        reviewed_by: get_opt_string(row, 7)?,
        created_at: parse_datetime(&row.get::<String>(8)?)?,
        updated_at: parse_datetime(&row.get::<String>(9)?)?,
        paid_at: parse_optional_datetime(get_opt_string(row, 10)?.as_deref())?,
    })
}

impl VestService {
    /// Invested principal, credited returns and the part of the returns still
    /// available for withdrawal.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if a query fails.
    pub async fn balance_for_user(&self, user_id: &str) -> Result<Balance, DatabaseError> {
        let invested = self
            .scalar_i64(
                "SELECT COALESCE(SUM(amount_cents), 0) FROM investments
                 WHERE user_id = ?1 AND status = 'active'",
                [user_id],
            )
            .await?;
        let returns = self
            .scalar_i64(
                "SELECT COALESCE(SUM(total_returns_cents), 0) FROM investments WHERE user_id = ?1",
                [user_id],
            )
            .await?;
        let reserved = self
            .scalar_i64(
                "SELECT COALESCE(SUM(amount_cents), 0) FROM withdrawals
                 WHERE user_id = ?1 AND status IN ('pending', 'approved', 'paid')",
                [user_id],
            )
            .await?;
        Ok(Balance::new(invested, returns, reserved))
    }

    /// Request a payout of credited returns.
    ///
    /// The balance check runs inside the write transaction, so two concurrent
    /// requests cannot both reserve the same funds.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless KYC is approved, `Validation` below the minimum
    /// or for a blank destination, `InsufficientFunds` above the withdrawable
    /// balance.
    pub async fn request_withdrawal(
        &self,
        user_id: &str,
        new: NewWithdrawal,
    ) -> Result<Withdrawal, DatabaseError> {
        let destination = require_text("destination", &new.destination)?;
        if new.amount_cents < self.min_withdrawal_cents() {
            return Err(DatabaseError::Validation(format!(
                "minimum withdrawal is {}",
                format_cents(self.min_withdrawal_cents())
            )));
        }

        self.write(|| async move {
            let user = self.get_user(user_id).await?;
            if user.kyc_status != KycStatus::Approved {
                return Err(DatabaseError::InvalidState(
                    "identity verification must be approved before withdrawing".into(),
                ));
            }

            let balance = self.balance_for_user(user_id).await?;
            if new.amount_cents > balance.withdrawable_cents {
                return Err(DatabaseError::InsufficientFunds {
                    requested_cents: new.amount_cents,
                    available_cents: balance.withdrawable_cents,
                });
            }

            let id = self.db().generate_id(PREFIX_WITHDRAWAL).await?;
            let now = Utc::now();
            self.db()
                .conn()
                .execute(
                    "INSERT INTO withdrawals
                     (id, user_id, amount_cents, method, destination, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                    libsql::params![
                        id.as_str(),
                        user_id,
                        new.amount_cents,
                        new.method.as_str(),
                        destination.as_str(),
                        WithdrawalStatus::Pending.as_str(),
                        now.to_rfc3339()
                    ],
                )
                .await?;

            self.audit(
                Some(user_id),
                EntityType::Withdrawal,
                &id,
                AuditAction::Created,
                Some(serde_json::json!({ "amount_cents": new.amount_cents })),
                now,
            )
            .await?;

            tracing::info!(withdrawal_id = %id, user_id, amount_cents = new.amount_cents, "withdrawal requested");
            Ok(Withdrawal {
                id,
                user_id: user_id.to_string(),
                amount_cents: new.amount_cents,
                method: new.method,
                destination,
                status: WithdrawalStatus::Pending,
                rejection_reason: None,
                reviewed_by: None,
                created_at: now,
                updated_at: now,
                paid_at: None,
            })
        })
        .await
    }

    /// # Errors
    ///
    /// `NotFound` when no withdrawal has this id.
    pub async fn get_withdrawal(&self, id: &str) -> Result<Withdrawal, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(&format!("SELECT {SELECT_COLS} FROM withdrawals WHERE id = ?1"), [id])
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("withdrawal", id))?;
        row_to_withdrawal(&row)
    }

    /// A user's withdrawals, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_withdrawals_for_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<Withdrawal>, DatabaseError> {
        self.fetch_page(
            &format!(
                "SELECT {SELECT_COLS} FROM withdrawals WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ),
            "SELECT COUNT(*) FROM withdrawals WHERE user_id = ?1",
            vec![user_id.into()],
            page,
            row_to_withdrawal,
        )
        .await
    }

    /// All withdrawals, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_withdrawals(
        &self,
        status: Option<WithdrawalStatus>,
        page: PageRequest,
    ) -> Result<Page<Withdrawal>, DatabaseError> {
        let (where_clause, params) = match status {
            Some(s) => ("WHERE status = ?1", vec![libsql::Value::from(s.as_str())]),
            None => ("", Vec::new()),
        };
        self.fetch_page(
            &format!(
                "SELECT {SELECT_COLS} FROM withdrawals {where_clause}
                 ORDER BY created_at ASC, rowid ASC"
            ),
            &format!("SELECT COUNT(*) FROM withdrawals {where_clause}"),
            params,
            page,
            row_to_withdrawal,
        )
        .await
    }

    /// # Errors
    ///
    /// `InvalidState` unless the withdrawal is pending.
    pub async fn approve_withdrawal(
        &self,
        actor_id: &str,
        id: &str,
    ) -> Result<Withdrawal, DatabaseError> {
        self.review_withdrawal(actor_id, id, WithdrawalStatus::Approved, None)
            .await
    }

    /// Reject a pending or approved withdrawal, releasing its reservation.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank reason, `InvalidState` once paid or rejected.
    pub async fn reject_withdrawal(
        &self,
        actor_id: &str,
        id: &str,
        reason: &str,
    ) -> Result<Withdrawal, DatabaseError> {
        let reason = require_text("reason", reason)?;
        self.review_withdrawal(actor_id, id, WithdrawalStatus::Rejected, Some(reason))
            .await
    }

    /// Record that an approved withdrawal was paid out.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the withdrawal is approved.
    pub async fn mark_withdrawal_paid(
        &self,
        actor_id: &str,
        id: &str,
    ) -> Result<Withdrawal, DatabaseError> {
        self.review_withdrawal(actor_id, id, WithdrawalStatus::Paid, None)
            .await
    }

    async fn review_withdrawal(
        &self,
        actor_id: &str,
        id: &str,
        next: WithdrawalStatus,
        reason: Option<String>,
    ) -> Result<Withdrawal, DatabaseError> {
        self.write(|| async move {
            let current = self.get_withdrawal(id).await?;
            if !current.status.can_transition_to(next) {
                return Err(DatabaseError::InvalidState(format!(
                    "withdrawal {id} is {} and cannot become {next}",
                    current.status
                )));
            }

            let now = Utc::now();
            let paid_at = (next == WithdrawalStatus::Paid).then_some(now);
            self.db()
                .conn()
                .execute(
                    "UPDATE withdrawals
                     SET status = ?1, rejection_reason = COALESCE(?2, rejection_reason),
                         reviewed_by = ?3, updated_at = ?4, paid_at = COALESCE(?5, paid_at)
                     WHERE id = ?6",
                    libsql::params![
                        next.as_str(),
                        opt_text(reason.as_deref()),
                        actor_id,
                        now.to_rfc3339(),
                        opt_text(paid_at.map(|t| t.to_rfc3339()).as_deref()),
                        id
                    ],
                )
                .await?;

            let detail = StatusChangedDetail {
                from: current.status.as_str().to_string(),
                to: next.as_str().to_string(),
                reason: reason.clone(),
            };
            self.audit(
                Some(actor_id),
                EntityType::Withdrawal,
                id,
                AuditAction::StatusChanged,
                Some(serde_json::to_value(&detail)?),
                now,
            )
            .await?;

            tracing::info!(withdrawal_id = id, status = %next, "withdrawal reviewed");
            Ok(Withdrawal {
                status: next,
                rejection_reason: reason.or(current.rejection_reason.clone()),
                reviewed_by: Some(actor_id.to_string()),
                updated_at: now,
                paid_at: paid_at.or(current.paid_at),
                ..current
            })
        })
        .await
    }
}
