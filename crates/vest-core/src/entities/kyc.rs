use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{IdDocumentType, ReviewStatus};

/// One identity verification attempt. A user may have several; only the
/// latest one drives `User::kyc_status`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct KycSubmission {
    pub id: String,
    pub user_id: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub address: String,
    pub country: String,
    pub id_type: IdDocumentType,
    pub id_number: String,
    /// Path of the ID document relative to the upload root.
    pub document_path: Option<String>,
    pub selfie_path: Option<String>,
    pub status: ReviewStatus,
    pub rejection_reason: Option<String>,
    pub reviewed_by: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}
