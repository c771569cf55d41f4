//! Index management, weekly distributions and closing holdings.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use vest_core::entities::{Distribution, Index};
use vest_core::enums::{IndexStatus, RiskLevel};
use vest_core::period::Period;
use vest_core::responses::DistributionReport;
use vest_db::repos::index::NewIndex;
use vest_db::updates::index::IndexUpdateBuilder;
use vest_mail::Message;

use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, double_option};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/indices", get(list).post(create))
        .route("/api/admin/indices/{id}", patch(update))
        .route("/api/admin/indices/{id}/status", post(transition))
        .route(
            "/api/admin/indices/{id}/distributions",
            get(distributions).post(distribute),
        )
        .route("/api/admin/investments/{id}/close", post(close_investment))
}

#[derive(Debug, Deserialize)]
pub struct CreateIndexRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub risk_level: RiskLevel,
    pub min_investment_cents: i64,
    pub target_weekly_rate_bps: i64,
}

#[derive(Debug, Deserialize)]
pub struct IndexPatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub risk_level: Option<RiskLevel>,
    pub min_investment_cents: Option<i64>,
    pub target_weekly_rate_bps: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: IndexStatus,
}

#[derive(Debug, Deserialize)]
pub struct DistributeRequest {
    pub rate_bps: i64,
    /// Defaults to the current ISO week.
    #[serde(default)]
    pub period: Option<Period>,
}

async fn list(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<Index>>, ApiError> {
    Ok(Json(state.service().list_indices(true).await?))
}

async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(req): ApiJson<CreateIndexRequest>,
) -> Result<(StatusCode, Json<Index>), ApiError> {
    let index = state
        .service()
        .create_index(
            &admin.id,
            NewIndex {
                name: req.name,
                description: req.description,
                risk_level: req.risk_level,
                min_investment_cents: req.min_investment_cents,
                target_weekly_rate_bps: req.target_weekly_rate_bps,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(index)))
}

async fn update(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<IndexPatch>,
) -> Result<Json<Index>, ApiError> {
    let mut builder = IndexUpdateBuilder::new();
    if let Some(name) = patch.name {
        builder = builder.name(name);
    }
    if let Some(description) = patch.description {
        builder = builder.description(description);
    }
    if let Some(risk) = patch.risk_level {
        builder = builder.risk_level(risk);
    }
    if let Some(cents) = patch.min_investment_cents {
        builder = builder.min_investment_cents(cents);
    }
    if let Some(bps) = patch.target_weekly_rate_bps {
        builder = builder.target_weekly_rate_bps(bps);
    }
    Ok(Json(
        state
            .service()
            .update_index(&admin.id, &id, builder.build())
            .await?,
    ))
}

async fn transition(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> Result<Json<Index>, ApiError> {
    Ok(Json(
        state
            .service()
            .transition_index(&admin.id, &id, req.status)
            .await?,
    ))
}

async fn distributions(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Distribution>>, ApiError> {
    let index = state.service().find_index(&id).await?;
    Ok(Json(state.service().list_distributions(&index.id).await?))
}

async fn distribute(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<DistributeRequest>,
) -> Result<(StatusCode, Json<DistributionReport>), ApiError> {
    let index = state.service().find_index(&id).await?;
    let report = state
        .service()
        .distribute_returns(&admin.id, &index.id, req.rate_bps, req.period)
        .await?;

    // Mail goes out after the response; a slow provider must not hold the request.
    let mail_state = state.clone();
    let mail_report = report.clone();
    tokio::spawn(async move { notify_investors(&mail_state, &mail_report).await });

    Ok((StatusCode::CREATED, Json(report)))
}

async fn notify_investors(state: &AppState, report: &DistributionReport) {
    for credit in &report.credits {
        let user = match state.service().get_user(&credit.user_id).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(user_id = %credit.user_id, error = %e, "skipping returns mail");
                continue;
            }
        };
        state
            .notify(
                &user.email,
                Message::ReturnsCredited {
                    name: &user.name,
                    index: &report.index_name,
                    amount_cents: credit.amount_cents,
                    period: report.distribution.period,
                },
            )
            .await;
    }
}

async fn close_investment(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<vest_core::entities::Investment>, ApiError> {
    Ok(Json(state.service().close_investment(&admin.id, &id).await?))
}
