//! Back-office routes. Every handler takes [`AdminUser`](crate::extract::AdminUser).

mod indices;
mod kyc;
mod payments;
mod system;
mod users;
mod withdrawals;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::PageQuery;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(kyc::routes())
        .merge(indices::routes())
        .merge(payments::routes())
        .merge(withdrawals::routes())
        .merge(system::routes())
}

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub reason: String,
}

/// `?status=&page=&per_page=` for the review queues.
#[derive(Debug, Deserialize)]
pub struct QueueQuery<S> {
    pub status: Option<S>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl<S> QueueQuery<S> {
    const fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Stream a stored upload back with its content type.
async fn stored_file(state: &AppState, relative: Option<&str>) -> Result<Response, ApiError> {
    let relative = relative.ok_or_else(|| ApiError::not_found("file"))?;
    let (bytes, content_type) = state.uploads().read(relative).await?;
    Ok(([(CONTENT_TYPE, content_type)], bytes).into_response())
}
