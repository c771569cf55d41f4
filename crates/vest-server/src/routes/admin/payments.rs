use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use vest_core::entities::PaymentRequest;
use vest_core::enums::ReviewStatus;
use vest_core::responses::Page;
use vest_mail::Message;

use super::{QueueQuery, ReasonRequest, stored_file};
use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/payments", get(queue))
        .route("/api/admin/payments/{id}", get(show))
        .route("/api/admin/payments/{id}/proof", get(proof))
        .route("/api/admin/payments/{id}/approve", post(approve))
        .route("/api/admin/payments/{id}/reject", post(reject))
}

async fn queue(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<QueueQuery<ReviewStatus>>,
) -> Result<Json<Page<PaymentRequest>>, ApiError> {
    let page = state.page(&query.page_query());
    Ok(Json(state.service().list_payments(query.status, page).await?))
}

async fn show(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentRequest>, ApiError> {
    Ok(Json(state.service().get_payment(&id).await?))
}

async fn proof(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let payment = state.service().get_payment(&id).await?;
    stored_file(&state, payment.proof_path.as_deref()).await
}

async fn approve(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentRequest>, ApiError> {
    let payment = state.service().approve_payment(&admin.id, &id).await?;
    let user = state.service().get_user(&payment.user_id).await?;
    let index = state.service().get_index(&payment.index_id).await?;
    state
        .notify(
            &user.email,
            Message::PaymentApproved {
                name: &user.name,
                index: &index.name,
                amount_cents: payment.amount_cents,
            },
        )
        .await;
    Ok(Json(payment))
}

async fn reject(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ReasonRequest>,
) -> Result<Json<PaymentRequest>, ApiError> {
    let payment = state
        .service()
        .reject_payment(&admin.id, &id, &req.reason)
        .await?;
    let user = state.service().get_user(&payment.user_id).await?;
    state
        .notify(
            &user.email,
            Message::PaymentRejected {
                name: &user.name,
                reason: payment.rejection_reason.as_deref().unwrap_or(&req.reason),
            },
        )
        .await;
    Ok(Json(payment))
}
