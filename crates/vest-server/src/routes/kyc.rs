//! Identity verification: view the latest submission or submit documents.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Serialize;
use vest_core::entities::KycSubmission;
use vest_core::enums::{IdDocumentType, KycStatus};
use vest_db::repos::kyc::NewKycSubmission;

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::state::AppState;
use crate::upload::MultipartForm;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/kyc", get(latest).post(submit))
}

#[derive(Debug, Serialize)]
pub struct KycView {
    pub kyc_status: KycStatus,
    pub submission: Option<KycSubmission>,
}

async fn latest(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<KycView>, ApiError> {
    let submission = state.service().latest_kyc_for_user(&user.id).await?;
    Ok(Json(KycView {
        kyc_status: user.kyc_status,
        submission,
    }))
}

/// Multipart fields: `full_name`, `date_of_birth` (`YYYY-MM-DD`), `address`,
/// `country`, `id_type`, `id_number`; files `document` (required) and `selfie`.
async fn submit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<KycSubmission>), ApiError> {
    let mut form = MultipartForm::read(multipart, state.uploads()).await?;

    let date_of_birth = NaiveDate::parse_from_str(form.require("date_of_birth")?.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::Validation("date_of_birth must be YYYY-MM-DD".into()))?;
    let id_type: IdDocumentType = serde_json::from_value(serde_json::Value::String(
        form.require("id_type")?.trim().to_string(),
    ))
    .map_err(|_| ApiError::Validation("id_type must be passport, national_id or drivers_license".into()))?;
    let mut new = NewKycSubmission {
        full_name: form.require("full_name")?.to_string(),
        date_of_birth,
        address: form.require("address")?.to_string(),
        country: form.require("country")?.to_string(),
        id_type,
        id_number: form.require("id_number")?.to_string(),
        document_path: None,
        selfie_path: None,
    };

    let document = form
        .take_file("document")
        .ok_or_else(|| ApiError::Validation("document is required".into()))?;
    let selfie = form.take_file("selfie");

    let uploads = state.uploads();
    let mut stored = vec![uploads.save("kyc", &user.id, "document", &document).await?];
    if let Some(selfie) = &selfie {
        match uploads.save("kyc", &user.id, "selfie", selfie).await {
            Ok(path) => stored.push(path),
            Err(e) => {
                for path in &stored {
                    uploads.remove(path).await;
                }
                return Err(e);
            }
        }
    }
    new.document_path = stored.first().cloned();
    new.selfie_path = stored.get(1).cloned();

    match state.service().submit_kyc(&user.id, new).await {
        Ok(submission) => Ok((StatusCode::CREATED, Json(submission))),
        Err(e) => {
            for path in &stored {
                uploads.remove(path).await;
            }
            Err(e.into())
        }
    }
}
