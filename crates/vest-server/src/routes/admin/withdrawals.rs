use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use vest_core::entities::Withdrawal;
use vest_core::enums::WithdrawalStatus;
use vest_core::responses::Page;
use vest_mail::Message;

use super::{QueueQuery, ReasonRequest};
use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, ApiQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/withdrawals", get(queue))
        .route("/api/admin/withdrawals/{id}/approve", post(approve))
        .route("/api/admin/withdrawals/{id}/reject", post(reject))
        .route("/api/admin/withdrawals/{id}/paid", post(mark_paid))
}

async fn queue(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<QueueQuery<WithdrawalStatus>>,
) -> Result<Json<Page<Withdrawal>>, ApiError> {
    let page = state.page(&query.page_query());
    Ok(Json(state.service().list_withdrawals(query.status, page).await?))
}

async fn approve(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Withdrawal>, ApiError> {
    let withdrawal = state.service().approve_withdrawal(&admin.id, &id).await?;
    notify_owner(&state, &withdrawal).await;
    Ok(Json(withdrawal))
}

async fn reject(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ReasonRequest>,
) -> Result<Json<Withdrawal>, ApiError> {
    let withdrawal = state
        .service()
        .reject_withdrawal(&admin.id, &id, &req.reason)
        .await?;
    notify_owner(&state, &withdrawal).await;
    Ok(Json(withdrawal))
}

async fn mark_paid(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Withdrawal>, ApiError> {
    let withdrawal = state.service().mark_withdrawal_paid(&admin.id, &id).await?;
    notify_owner(&state, &withdrawal).await;
    Ok(Json(withdrawal))
}

async fn notify_owner(state: &AppState, withdrawal: &Withdrawal) {
    match state.service().get_user(&withdrawal.user_id).await {
        Ok(user) => {
            state
                .notify(
                    &user.email,
                    Message::WithdrawalStatus {
                        name: &user.name,
                        status: withdrawal.status,
                        amount_cents: withdrawal.amount_cents,
                        reason: withdrawal.rejection_reason.as_deref(),
                    },
                )
                .await;
        }
        Err(e) => tracing::warn!(withdrawal_id = %withdrawal.id, error = %e, "skipping withdrawal mail"),
    }
}
