//! Offline payment requests owned by the caller.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vest_core::entities::PaymentRequest;
use vest_core::enums::PaymentMethod;
use vest_core::responses::Page;
use vest_db::repos::payment::NewPaymentRequest;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, AuthUser, PageQuery};
use crate::state::AppState;
use crate::upload::MultipartForm;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments", get(list).post(create))
        .route("/api/payments/{id}", get(show))
        .route("/api/payments/{id}/proof", post(attach_proof))
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub index_id: String,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Page<PaymentRequest>>, ApiError> {
    let page = state.page(&query);
    Ok(Json(state.service().list_payments_for_user(&user.id, page).await?))
}

async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentRequest>), ApiError> {
    // Accept slugs as well as ids.
    let index = state.service().find_index(&req.index_id).await?;
    let payment = state
        .service()
        .create_payment_request(
            &user.id,
            NewPaymentRequest {
                index_id: index.id,
                amount_cents: req.amount_cents,
                method: req.method,
                reference: req.reference,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn show(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<PaymentRequest>, ApiError> {
    let payment = state.service().get_payment(&id).await?;
    if payment.user_id != user.id {
        return Err(ApiError::not_found("payment"));
    }
    Ok(Json(payment))
}

/// Multipart with a single `proof` file.
async fn attach_proof(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<PaymentRequest>, ApiError> {
    let mut form = MultipartForm::read(multipart, state.uploads()).await?;
    let proof = form
        .take_file("proof")
        .ok_or_else(|| ApiError::Validation("proof is required".into()))?;

    let payment = state.service().get_payment(&id).await?;
    if payment.user_id != user.id {
        return Err(ApiError::not_found("payment"));
    }

    let path = state.uploads().save("payments", &user.id, "proof", &proof).await?;
    match state.service().attach_payment_proof(&user.id, &id, &path).await {
        Ok(payment) => Ok(Json(payment)),
        Err(e) => {
            state.uploads().remove(&path).await;
            Err(e.into())
        }
    }
}
