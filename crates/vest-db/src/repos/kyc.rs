//! KYC repository: identity verification submissions and their review.

use chrono::{DateTime, NaiveDate, Utc};

use vest_core::audit_detail::StatusChangedDetail;
use vest_core::entities::KycSubmission;
use vest_core::enums::{AuditAction, EntityType, IdDocumentType, KycStatus, ReviewStatus};
use vest_core::ids::PREFIX_KYC;
use vest_core::responses::Page;

use crate::error::DatabaseError;
use crate::helpers::{
    PageRequest, get_opt_string, parse_date, parse_datetime, parse_enum, parse_optional_datetime,
    require_text,
};
use crate::service::VestService;

/// Minimum applicant age, in whole years, on the submission date.
pub const MIN_KYC_AGE_YEARS: u32 = 18;

const SELECT_COLS: &str = "id, user_id, full_name, date_of_birth, address, country, id_type, \
     id_number, document_path, selfie_path, status, rejection_reason, reviewed_by, \
     submitted_at, reviewed_at";

/// Input for [`VestService::submit_kyc`]. File paths are relative to the upload root.
#[derive(Debug, Clone)]
pub struct NewKycSubmission {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub country: String,
    pub id_type: IdDocumentType,
    pub id_number: String,
    pub document_path: Option<String>,
    pub selfie_path: Option<String>,
}

fn row_to_kyc(row: &libsql::Row) -> Result<KycSubmission, DatabaseError> {
    Ok(KycSubmission {
        id: row.get(0)?,
        user_id: row.get(1)?,
        full_name: row.get(2)?,
        date_of_birth: parse_date(&row.get::<String>(3)?)?,
        address: row.get(4)?,
        country: row.get(5)?,
        id_type: parse_enum(&row.get::<String>(6)?)?,
        id_number: row.get(7)?,
        document_path: get_opt_string(row, 8)?,
        selfie_path: get_opt_string(row, 9)?,
        status: parse_enum(&row.get::<String>(10)?)?,
        rejection_reason: get_opt_string(row, 11)?,
        reviewed_by: get_opt_string(row, 12)?,
        submitted_at: parse_datetime(&row.get::<String>(13)?)?,
        reviewed_at: parse_optional_datetime(get_opt_string(row, 14)?.as_deref())?,
    })
}

/// Whether someone born on `date_of_birth` is at least [`MIN_KYC_AGE_YEARS`] on `on`.
#[must_use]
pub fn is_of_age(date_of_birth: NaiveDate, on: NaiveDate) -> bool {
    on.years_since(date_of_birth)
        .is_some_and(|years| years >= MIN_KYC_AGE_YEARS)
}

impl VestService {
    /// Submit identity details for review.
    ///
    /// # Errors
    ///
    /// `InvalidState` unless the user's KYC status is `not_submitted` or
    /// `rejected`; `Validation` for blank fields or an applicant under 18.
    pub async fn submit_kyc(
        &self,
        user_id: &str,
        new: NewKycSubmission,
    ) -> Result<KycSubmission, DatabaseError> {
        let full_name = require_text("full_name", &new.full_name)?;
        let address = require_text("address", &new.address)?;
        let country = require_text("country", &new.country)?;
        let id_number = require_text("id_number", &new.id_number)?;

        let now = Utc::now();
        if !is_of_age(new.date_of_birth, now.date_naive()) {
            return Err(DatabaseError::Validation(format!(
                "applicants must be at least {MIN_KYC_AGE_YEARS} years old"
            )));
        }

        self.write(|| async move {
            let user = self.get_user(user_id).await?;
            if !user.kyc_status.can_transition_to(KycStatus::Pending) {
                return Err(DatabaseError::InvalidState(format!(
                    "KYC cannot be submitted while status is {}",
                    user.kyc_status
                )));
            }

            let id = self.db().generate_id(PREFIX_KYC).await?;
            self.db()
                .conn()
                .execute(
                    &format!(
                        "INSERT INTO kyc_submissions ({SELECT_COLS})
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL, NULL, ?12, NULL)"
                    ),
                    libsql::params![
                        id.as_str(),
                        user_id,
                        full_name.as_str(),
                        new.date_of_birth.format("%Y-%m-%d").to_string(),
                        address.as_str(),
                        country.as_str(),
                        new.id_type.as_str(),
                        id_number.as_str(),
                        new.document_path.as_deref(),
                        new.selfie_path.as_deref(),
                        ReviewStatus::Pending.as_str(),
                        now.to_rfc3339()
                    ],
                )
                .await?;

            self.set_kyc_status_inner(user_id, KycStatus::Pending, now)
                .await?;
            self.audit(
                Some(user_id),
                EntityType::Kyc,
                &id,
                AuditAction::Created,
                None,
                now,
            )
            .await?;

            tracing::info!(kyc_id = %id, user_id, "KYC submitted");
            Ok(KycSubmission {
                id,
                user_id: user_id.to_string(),
                full_name,
                date_of_birth: new.date_of_birth,
                address,
                country,
                id_type: new.id_type,
                id_number,
                document_path: new.document_path,
                selfie_path: new.selfie_path,
                status: ReviewStatus::Pending,
                rejection_reason: None,
                reviewed_by: None,
                submitted_at: now,
                reviewed_at: None,
            })
        })
        .await
    }

    /// # Errors
    ///
    /// `NotFound` when no submission has this id.
    pub async fn get_kyc(&self, id: &str) -> Result<KycSubmission, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!("SELECT {SELECT_COLS} FROM kyc_submissions WHERE id = ?1"),
                [id],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| DatabaseError::not_found("KYC submission", id))?;
        row_to_kyc(&row)
    }

    /// The user's most recent submission, if any.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn latest_kyc_for_user(
        &self,
        user_id: &str,
    ) -> Result<Option<KycSubmission>, DatabaseError> {
        let mut rows = self
            .db()
            .conn()
            .query(
                &format!(
                    "SELECT {SELECT_COLS} FROM kyc_submissions WHERE user_id = ?1
                     ORDER BY submitted_at DESC, rowid DESC LIMIT 1"
                ),
                [user_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_kyc(&row)?)),
            None => Ok(None),
        }
    }

    /// List submissions, oldest first so the review queue is FIFO.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn list_kyc(
        &self,
        status: Option<ReviewStatus>,
        page: PageRequest,
    ) -> Result<Page<KycSubmission>, DatabaseError> {
        let (where_clause, params) = match status {
            Some(s) => ("WHERE status = ?1", vec![libsql::Value::from(s.as_str())]),
            None => ("", Vec::new()),
        };
        self.fetch_page(
            &format!(
                "SELECT {SELECT_COLS} FROM kyc_submissions {where_clause}
                 ORDER BY submitted_at ASC, rowid ASC"
            ),
            &format!("SELECT COUNT(*) FROM kyc_submissions {where_clause}"),
            params,
            page,
            row_to_kyc,
        )
        .await
    }

    /// Approve a pending submission and mark the user verified.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `InvalidState` unless the submission is pending.
    pub async fn approve_kyc(
        &self,
        actor_id: &str,
        id: &str,
    ) -> Result<KycSubmission, DatabaseError> {
        self.review_kyc(actor_id, id, ReviewStatus::Approved, None)
            .await
    }

    /// Reject a pending submission. The user may resubmit afterwards.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank reason, otherwise as [`Self::approve_kyc`].
    pub async fn reject_kyc(
        &self,
        actor_id: &str,
        id: &str,
        reason: &str,
    ) -> Result<KycSubmission, DatabaseError> {
        let reason = require_text("reason", reason)?;
        self.review_kyc(actor_id, id, ReviewStatus::Rejected, Some(reason))
            .await
    }

    async fn review_kyc(
        &self,
        actor_id: &str,
        id: &str,
        decision: ReviewStatus,
        reason: Option<String>,
    ) -> Result<KycSubmission, DatabaseError> {
        let user_status = match decision {
            ReviewStatus::Approved => KycStatus::Approved,
            ReviewStatus::Rejected => KycStatus::Rejected,
            ReviewStatus::Pending => {
                return Err(DatabaseError::Validation(
                    "a review must approve or reject".into(),
                ));
            }
        };

        self.write(|| async move {
            let current = self.get_kyc(id).await?;
            if !current.status.can_transition_to(decision) {
                return Err(DatabaseError::InvalidState(format!(
                    "KYC submission {id} is already {}",
                    current.status
                )));
            }
            let user = self.get_user(&current.user_id).await?;
            if !user.kyc_status.can_transition_to(user_status) {
                return Err(DatabaseError::InvalidState(format!(
                    "user {} has KYC status {}",
                    user.id, user.kyc_status
                )));
            }

            let now: DateTime<Utc> = Utc::now();
            self.db()
                .conn()
                .execute(
                    "UPDATE kyc_submissions
                     SET status = ?1, rejection_reason = ?2, reviewed_by = ?3, reviewed_at = ?4
                     WHERE id = ?5",
                    libsql::params![
                        decision.as_str(),
                        reason.as_deref(),
                        actor_id,
                        now.to_rfc3339(),
                        id
                    ],
                )
                .await?;
            self.set_kyc_status_inner(&current.user_id, user_status, now)
                .await?;

            let detail = StatusChangedDetail {
                from: current.status.as_str().to_string(),
                to: decision.as_str().to_string(),
                reason: reason.clone(),
            };
            self.audit(
                Some(actor_id),
                EntityType::Kyc,
                id,
                AuditAction::StatusChanged,
                Some(serde_json::to_value(&detail)?),
                now,
            )
            .await?;

            tracing::info!(kyc_id = id, actor_id, decision = %decision, "KYC reviewed");
            Ok(KycSubmission {
                status: decision,
                rejection_reason: reason,
                reviewed_by: Some(actor_id.to_string()),
                reviewed_at: Some(now),
                ..current
            })
        })
        .await
    }
}
