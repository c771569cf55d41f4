use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use vest_core::entities::{Investment, KycSubmission, User};
use vest_core::enums::{KycStatus, Role};
use vest_core::responses::{Balance, Page};
use vest_db::repos::user::UserFilter;

use crate::error::ApiError;
use crate::extract::{AdminUser, ApiJson, ApiQuery, PageQuery};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/users", get(list))
        .route("/api/admin/users/{id}", get(show))
        .route("/api/admin/users/{id}/role", post(set_role))
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub kyc_status: Option<KycStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct UserDetail {
    pub user: User,
    pub kyc: Option<KycSubmission>,
    pub balance: Balance,
    pub investments: Vec<Investment>,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<UserQuery>,
) -> Result<Json<Page<User>>, ApiError> {
    let page = state.page(&PageQuery {
        page: query.page,
        per_page: query.per_page,
    });
    let filter = UserFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        role: query.role,
        kyc_status: query.kyc_status,
    };
    Ok(Json(state.service().list_users(&filter, page).await?))
}

async fn show(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> Result<Json<UserDetail>, ApiError> {
    let service = state.service();
    let user = service.get_user(&id).await?;
    let kyc = service.latest_kyc_for_user(&id).await?;
    let balance = service.balance_for_user(&id).await?;
    let investments = service.list_investments_for_user(&id).await?;
    Ok(Json(UserDetail {
        user,
        kyc,
        balance,
        investments,
    }))
}

async fn set_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<RoleRequest>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.service().set_role(&admin.id, &id, req.role).await?))
}
