//! Unauthenticated endpoints.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use vest_core::entities::Index;
use vest_core::enums::IndexStatus;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/indices", get(list_indices))
        .route("/api/indices/{id}", get(get_index))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "database": if state.service().db().is_remote() { "remote" } else { "local" },
    }))
}

async fn list_indices(State(state): State<AppState>) -> Result<Json<Vec<Index>>, ApiError> {
    Ok(Json(state.service().list_indices(false).await?))
}

/// Accepts an id or a slug. Only active indices are public.
async fn get_index(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Index>, ApiError> {
    let index = state.service().find_index(&id).await?;
    if index.status != IndexStatus::Active {
        return Err(ApiError::not_found("index"));
    }
    Ok(Json(index))
}
