//! The caller's own profile, password and dashboard.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use vest_core::entities::User;
use vest_core::responses::PortfolioSummary;
use vest_db::updates::profile::ProfileUpdate;

use crate::credentials::{hash_password, verify_password};
use crate::error::ApiError;
use crate::extract::{ApiJson, AuthUser, double_option};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/me", get(me).patch(update_me))
        .route("/api/me/password", post(change_password))
        .route("/api/dashboard", get(dashboard))
}

#[derive(Debug, Deserialize)]
pub struct ProfilePatch {
    #[serde(default)]
    pub name: Option<String>,
    /// `null` clears the phone number; an absent field leaves it alone.
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

async fn me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

async fn update_me(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> Result<Json<User>, ApiError> {
    let update = ProfileUpdate {
        name: patch.name,
        phone: patch.phone,
    };
    Ok(Json(state.service().update_profile(&user.id, update).await?))
}

async fn change_password(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let stored = state.service().password_hash(&user.id).await?;
    if !verify_password(req.current_password, stored).await? {
        return Err(ApiError::Validation("current password is incorrect".into()));
    }
    let new_hash = hash_password(req.new_password).await?;
    state.service().set_password_hash(&user.id, &new_hash).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<PortfolioSummary>, ApiError> {
    Ok(Json(state.service().portfolio_summary(&user.id).await?))
}
