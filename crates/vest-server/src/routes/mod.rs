//! HTTP routes, grouped by audience.

mod admin;
mod auth;
mod investments;
mod kyc;
mod me;
mod payments;
mod public;
mod withdrawals;

use axum::Router;

use crate::state::AppState;

/// Every route, unlayered and without state.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(public::routes())
        .merge(auth::routes())
        .merge(me::routes())
        .merge(kyc::routes())
        .merge(payments::routes())
        .merge(investments::routes())
        .merge(withdrawals::routes())
        .merge(admin::routes())
}
