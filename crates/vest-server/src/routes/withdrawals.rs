use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use vest_core::entities::Withdrawal;
use vest_core::enums::PaymentMethod;
use vest_core::responses::{Balance, Page};
use vest_db::repos::withdrawal::NewWithdrawal;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, AuthUser, PageQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/withdrawals", get(list).post(request))
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub destination: String,
}

#[derive(Debug, Serialize)]
pub struct WithdrawalsView {
    pub balance: Balance,
    #[serde(flatten)]
    pub withdrawals: Page<Withdrawal>,
}

async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<WithdrawalsView>, ApiError> {
    let page = state.page(&query);
    let withdrawals = state.service().list_withdrawals_for_user(&user.id, page).await?;
    let balance = state.service().balance_for_user(&user.id).await?;
    Ok(Json(WithdrawalsView { balance, withdrawals }))
}

async fn request(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<WithdrawalRequest>,
) -> Result<(StatusCode, Json<Withdrawal>), ApiError> {
    let withdrawal = state
        .service()
        .request_withdrawal(
            &user.id,
            NewWithdrawal {
                amount_cents: req.amount_cents,
                method: req.method,
                destination: req.destination,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(withdrawal)))
}
