use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use vest_core::entities::Investment;
use vest_core::responses::InvestmentDetail;

use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/investments", get(list))
        .route("/api/investments/{id}", get(show))
}

async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Investment>>, ApiError> {
    Ok(Json(state.service().list_investments_for_user(&user.id).await?))
}

async fn show(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<InvestmentDetail>, ApiError> {
    let detail = state.service().investment_detail(&id).await?;
    if detail.investment.user_id != user.id {
        return Err(ApiError::not_found("investment"));
    }
    Ok(Json(detail))
}
