use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use vest_core::entities::KycSubmission;
use vest_core::enums::ReviewStatus;
use vest_core::responses::Page;
use vest_mail::Message;

use super::{QueueQuery, ReasonRequest, stored_file};
use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/kyc", get(queue))
        .route("/api/admin/kyc/{id}", get(show))
        .route("/api/admin/kyc/{id}/files/{kind}", get(file))
        .route("/api/admin/kyc/{id}/approve", post(approve))
        .route("/api/admin/kyc/{id}/reject", post(reject))
}

async fn queue(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<QueueQuery<ReviewStatus>>,
) -> Result<Json<Page<KycSubmission>>, ApiError> {
    let page = state.page(&query.page_query());
    Ok(Json(state.service().list_kyc(query.status, page).await?))
}

async fn show(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<KycSubmission>, ApiError> {
    Ok(Json(state.service().get_kyc(&id).await?))
}

/// `kind` is `document` or `selfie`.
async fn file(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path((id, kind)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let submission = state.service().get_kyc(&id).await?;
    let path = match kind.as_str() {
        "document" => submission.document_path,
        "selfie" => submission.selfie_path,
        _ => return Err(ApiError::not_found(format!("file kind '{kind}'"))),
    };
    stored_file(&state, path.as_deref()).await
}

async fn approve(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<KycSubmission>, ApiError> {
    let submission = state.service().approve_kyc(&admin.id, &id).await?;
    let user = state.service().get_user(&submission.user_id).await?;
    state
        .notify(&user.email, Message::KycApproved { name: &user.name })
        .await;
    Ok(Json(submission))
}

async fn reject(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ReasonRequest>,
) -> Result<Json<KycSubmission>, ApiError> {
    let submission = state.service().reject_kyc(&admin.id, &id, &req.reason).await?;
    let user = state.service().get_user(&submission.user_id).await?;
    state
        .notify(
            &user.email,
            Message::KycRejected {
                name: &user.name,
                reason: submission.rejection_reason.as_deref().unwrap_or(&req.reason),
            },
        )
        .await;
    Ok(Json(submission))
}
