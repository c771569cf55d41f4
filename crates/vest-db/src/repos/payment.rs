//! Payment request repository: offline payments that become investments on approval.

use chrono::Utc;

use vest_core::audit_detail::{PaymentApprovedDetail, StatusChangedDetail};
use vest_core::entities::PaymentRequest;
use vest_core::enums::{AuditAction, EntityType, IndexStatus, KycStatus, PaymentMethod, ReviewStatus};
use vest_core::ids::PREFIX_PAYMENT;
use vest_core::responses::Page;

use crate::error::DatabaseError;
use crate::helpers::{
    PageRequest, get_opt_string, parse_datetime, parse_enum, parse_optional_datetime, require_text,
};
use crate::service::VestService;

const SELECT_COLS: &str = "id, user_id, index_id, amount_cents, method, reference, proof_path, \
     status, rejection_reason, reviewed_by, investment_id, created_at, reviewed_at";

/// Input for [`VestService::create_payment_request`].
#[derive(Debug, Clone)]
pub struct NewPaymentRequest {
    pub index_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// Bank or transfer reference quoted by the user.
    pub reference: Option<String>,
}

fn row_to_payment(row: &libsql::Row) -> Result<PaymentRequest, DatabaseError> {
    Ok(PaymentRequest {
        id: row.get(0)?,
        user_id: row.get(1)?,
        index_id: row.get(2)?,
        amount_cents: row.get(3)?,
        method: parse_enum(&row.get::<String>(4)?)?,
        reference: get_opt_string(row, 5)?,
        proof_path: get_opt_string(row, 6)?,
        status: parse_enum(&row.get::<String>(7)?)?,
        rejection_reason: get_opt_string(row, 8)?,
        reviewed_by: get_opt_string(row, 9)?,
        investment_id: get_opt_string(row, 10)?,
        created_at: parse_datetime(&row.get::<String>(11)?)?,
        reviewed_at: parse_optional_datetime(get_opt_string(row, 12)?.as_deref())?,
    })
}

impl VestService {
    /// Declare an offline payment towards an index.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the user is KYC-approved and the index is active;
    /// `Validation` when the amount is below the index minimum.
    pub async fn create_payment_request(
        &self,
        user_id: &str,
        new: NewPaymentRequest,
    ) -> Result<PaymentRequest, DatabaseError> {
        let reference = new
            .reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);

        self.write(|| async move {
            let user = self.get_user(user_id).await?;
            if user.kyc_status != KycStatus::Approved {
                return Err(DatabaseError::InvalidState(
                    "identity verification must be approved before investing".into(),
                ));
            }
            let index = self.get_index(&new.index_id).await?;
            if index.status != IndexStatus::Active {
                return Err(DatabaseError::InvalidState(format!(
                    "index {} is {}",
                    index.name, index.status
                )));
            }
            if new.amount_cents < index.min_investment_cents {
                return Err(DatabaseError::Validation(format!(
                    "amount {} is below the minimum investment of {} for {}",
                    new.amount_cents, index.min_investment_cents, index.name
                )));
            }

            let now = Utc::now();
            let id = self.db().generate_id(PREFIX_PAYMENT).await?;
            self.db()
                .conn()
                .execute(
                    "INSERT INTO payment_requests (id, user_id, index_id, amount_cents, method, reference, status, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    libsql::params![
                        id.as_str(),
                        user_id,
                        index.id.as_str(),
                        new.amount_cents,
                        new.method.as_str(),
                        reference.as_deref(),
                        ReviewStatus::Pending.as_str(),
                        now.to_rfc3339()
                    ],
                )
                .await?;

            self.audit(Some(user_id), EntityType::Payment, &id, AuditAction::Created, None, now)
                .await?;

            tracing::info!(payment_id = %id, user_id, index_id = %index.id, amount_cents = new.amount_cents, "payment request created");
            Ok(PaymentRequest {
                id,
                user_id: user_id.to_string(),
                index_id: index.id,
                amount_cents: new.amount_cents,
                method: new.method,
                reference,
                proof_path: None,
                status: ReviewStatus::Pending,
                rejection_reason: None,
                reviewed_by: None,
                investment_id: None,
                created_at: now,
                reviewed_at: None,
            })
        })
        .await
    }

    /// Record the stored proof-of-payment file for a pending request.
    ///
    /// # Errors
    ///
    /// `NotFound` when the payment does not exist or belongs to another user,
    /// `InvalidState` once it has been reviewed.
    pub async fn attach_payment_proof(
        &self,
        user_id: &str,
        id: &str,
        path: &str,
    ) -> Result<PaymentRequest, DatabaseError> {
        self.write(|| async move {
            let current = self.get_payment(id).await?;
            if current.user_id != user_id {
                return Err(DatabaseError::not_found("payment", id));
            }
            if current.status != ReviewStatus::Pending {
                return Err(DatabaseError::InvalidState(format!(
                    "payment {id} is already {}",
                    current.status
                )));
            }

            let now = Utc::now();
            self.db()
                .conn()
                .execute(
                    "UPDATE payment_requests SET proof_path = ?1 WHERE id = ?2",
                    libsql::params![path, id],
                )
                .await?;
            self.audit(
                Some(user_id),
                EntityType::Payment,
                id,
                AuditAction::ProofAttached,
                Some(serde_json::json!({ "path": path })),
                now,
            )
            .await?;

            Ok(PaymentRequest {
                proof_path: Some(path.to_string()),
                ..current
            })
        })
        .await
    }

    /// # Errors
    ///
    /// `NotFound` when no payment has this id.
    pub async fn get_payment(&self, id: &str) -> Result<PaymentRequest, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM payment_requests WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("payment", id))?;
        row_to_payment(&row)
    }

    /// A user's payment requests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_payments_for_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> Result<Page<PaymentRequest>, DatabaseError> {
        self.fetch_page(
            &format!(
                "SELECT {SELECT_COLS} FROM payment_requests WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC"
            ),
            "SELECT COUNT(*) FROM payment_requests WHERE user_id = ?1",
            vec![user_id.into()],
            page,
            row_to_payment,
        )
        .await
    }

    /// All payment requests, oldest first so the review queue is FIFO.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_payments(
        &self,
        status: Option<ReviewStatus>,
        page: PageRequest,
    ) -> Result<Page<PaymentRequest>, DatabaseError> {
        let (where_clause, params) = match status {
            Some(s) => ("WHERE status = ?1", vec![libsql::Value::from(s.as_str())]),
            None => ("", Vec::new()),
        };
        self.fetch_page(
            &format!(
                "SELECT {SELECT_COLS} FROM payment_requests {where_clause}
                 ORDER BY created_at ASC, rowid ASC"
            ),
            &format!("SELECT COUNT(*) FROM payment_requests {where_clause}"),
            params,
            page,
            row_to_payment,
        )
        .await
    }

    /// Approve a pending payment and, in the same transaction, open an
    /// `active` investment for the same amount.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidState` unless pending.
    pub async fn approve_payment(
        &self,
        actor_id: &str,
        id: &str,
    ) -> Result<PaymentRequest, DatabaseError> {
        self.write(|| async move {
            let current = self.get_payment(id).await?;
            if !current.status.can_transition_to(ReviewStatus::Approved) {
                return Err(DatabaseError::InvalidState(format!(
                    "payment {id} is already {}",
                    current.status
                )));
            }

            let now = Utc::now();
            let investment = self
                .insert_investment_inner(
                    &current.user_id,
                    &current.index_id,
                    Some(id),
                    current.amount_cents,
                    now,
                )
                .await?;

            self.db()
                .conn()
                .execute(
                    "UPDATE payment_requests
                     SET status = ?1, reviewed_by = ?2, reviewed_at = ?3, investment_id = ?4
                     WHERE id = ?5",
                    libsql::params![
                        ReviewStatus::Approved.as_str(),
                        actor_id,
                        now.to_rfc3339(),
                        investment.id.as_str(),
                        id
                    ],
                )
                .await?;

            let detail = PaymentApprovedDetail {
                investment_id: investment.id.clone(),
                amount_cents: current.amount_cents,
            };
            self.audit(
                Some(actor_id),
                EntityType::Payment,
                id,
                AuditAction::StatusChanged,
                Some(serde_json::to_value(&detail)?),
                now,
            )
            .await?;

            tracing::info!(payment_id = id, investment_id = %investment.id, "payment approved");
            Ok(PaymentRequest {
                status: ReviewStatus::Approved,
                reviewed_by: Some(actor_id.to_string()),
                reviewed_at: Some(now),
                investment_id: Some(investment.id),
                ..current
            })
        })
        .await
    }

    /// Reject a pending payment.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank reason, otherwise as [`Self::approve_payment`].
    pub async fn reject_payment(
        &self,
        actor_id: &str,
        id: &str,
        reason: &str,
    ) -> Result<PaymentRequest, DatabaseError> {
        let reason = require_text("reason", reason)?;
        self.write(|| async move {
            let current = self.get_payment(id).await?;
            if !current.status.can_transition_to(ReviewStatus::Rejected) {
                return Err(DatabaseError::InvalidState(format!(
                    "payment {id} is already {}",
                    current.status
                )));
            }

            let now = Utc::now();
            self.db()
                .conn()
                .execute(
                    "UPDATE payment_requests
                     SET status = ?1, rejection_reason = ?2, reviewed_by = ?3, reviewed_at = ?4
                     WHERE id = ?5",
                    libsql::params![
                        ReviewStatus::Rejected.as_str(),
                        reason.as_str(),
                        actor_id,
                        now.to_rfc3339(),
                        id
                    ],
                )
                .await?;

            let detail = StatusChangedDetail {
                from: current.status.as_str().to_string(),
                to: ReviewStatus::Rejected.as_str().to_string(),
                reason: Some(reason.clone()),
            };
            self.audit(
                Some(actor_id),
                EntityType::Payment,
                id,
                AuditAction::StatusChanged,
                Some(serde_json::to_value(&detail)?),
                now,
            )
            .await?;

            tracing::info!(payment_id = id, "payment rejected");
            Ok(PaymentRequest {
                status: ReviewStatus::Rejected,
                rejection_reason: Some(reason),
                reviewed_by: Some(actor_id.to_string()),
                reviewed_at: Some(now),
                ..current
            })
        })
        .await
    }
}
