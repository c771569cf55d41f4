//! Registration, login and password reset.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use vest_auth::{generate_reset_token, hash_reset_token};
use vest_core::entities::User;
use vest_core::enums::Role;
use vest_core::responses::AuthResponse;
use vest_db::repos::user::NewUser;
use vest_mail::Message;

use crate::credentials::{hash_password, verify_password, verify_unknown_account};
use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/password/forgot", post(forgot_password))
        .route("/api/auth/password/reset", post(reset_password))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Reset links never outlive a week, whatever the configuration says.
const MAX_RESET_TTL_SECS: u64 = 7 * 24 * 3600;

fn reset_expiry(now: DateTime<Utc>, ttl_secs: u64) -> DateTime<Utc> {
    let secs = i64::try_from(ttl_secs.min(MAX_RESET_TTL_SECS)).unwrap_or(0);
    now.checked_add_signed(TimeDelta::seconds(secs)).unwrap_or(now)
}

pub(crate) fn issue(state: &AppState, user: User) -> Result<AuthResponse, ApiError> {
    let issued = state.signer().issue(&user.id, user.role)?;
    Ok(AuthResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user,
    })
}

async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let password_hash = hash_password(req.password).await?;
    let user = state
        .service()
        .create_user(NewUser {
            name: req.name,
            email: req.email,
            phone: req.phone,
            password_hash,
            role: Role::User,
        })
        .await?;

    state
        .notify(&user.email, Message::Welcome { name: &user.name })
        .await;
    Ok((StatusCode::CREATED, Json(issue(&state, user)?)))
}

async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("invalid email or password".into());

    let Some((user, hash)) = state.service().find_user_by_email(&req.email).await? else {
        verify_unknown_account(req.password).await?;
        return Err(invalid());
    };
    if !verify_password(req.password, hash).await? {
        tracing::info!(user_id = %user.id, "failed login");
        return Err(invalid());
    }
    Ok(Json(issue(&state, user)?))
}

/// Always 202 so the response does not reveal which emails are registered.
async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ForgotPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let Some((user, _)) = state.service().find_user_by_email(&req.email).await? else {
        return Ok(StatusCode::ACCEPTED);
    };

    let reset = generate_reset_token()?;
    let expires_at = reset_expiry(Utc::now(), state.config().auth.reset_ttl_secs);
    state
        .service()
        .store_reset_token(&user.id, &reset.token_hash, expires_at)
        .await?;

    let link = format!("{}/reset-password?token={}", state.mailer().app_url(), reset.token);
    state
        .notify(
            &user.email,
            Message::PasswordReset {
                name: &user.name,
                link: &link,
            },
        )
        .await;
    Ok(StatusCode::ACCEPTED)
}

async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    let new_hash = hash_password(req.password).await?;
    let user_id = state
        .service()
        .reset_password_with_token(&hash_reset_token(&req.token), &new_hash, Utc::now())
        .await?;
    tracing::info!(user_id, "password reset");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reset_expiry_uses_configured_ttl() {
        let now = Utc::now();
        assert_eq!(reset_expiry(now, 900), now + TimeDelta::seconds(900));
    }

    #[test]
    fn reset_expiry_clamps_extreme_ttl() {
        let now = Utc::now();
        let week = TimeDelta::seconds(7 * 24 * 3600);
        assert_eq!(reset_expiry(now, u64::MAX), now + week);
        assert_eq!(reset_expiry(now, u64::try_from(i64::MAX).unwrap()), now + week);
    }
}
