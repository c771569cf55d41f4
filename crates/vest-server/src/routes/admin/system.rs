use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use vest_core::entities::AuditEntry;
use vest_core::enums::{AuditAction, EntityType};
use vest_core::responses::PlatformStats;
use vest_db::repos::audit::AuditFilter;

use crate::error::ApiError;
use crate::extract::{AdminUser, ApiQuery};
use crate::state::AppState;

const DEFAULT_AUDIT_LIMIT: u32 = 100;
const MAX_AUDIT_LIMIT: u32 = 1_000;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/audit", get(audit))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<String>,
    pub actor_id: Option<String>,
    pub action: Option<AuditAction>,
    pub limit: Option<u32>,
}

async fn stats(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<PlatformStats>, ApiError> {
    Ok(Json(state.service().platform_stats().await?))
}

async fn audit(
    State(state): State<AppState>,
    _admin: AdminUser,
    ApiQuery(query): ApiQuery<AuditQuery>,
) -> Result<Json<Vec<AuditEntry>>, ApiError> {
    let filter = AuditFilter {
        entity_type: query.entity_type,
        entity_id: query.entity_id,
        actor_id: query.actor_id,
        action: query.action,
        limit: Some(query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT)),
    };
    Ok(Json(state.service().query_audit(&filter).await?))
}
